//! Layer definitions for the declared network graph.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ConfigError, Result};
use crate::ids::LayerRef;

/// Declared shape of a single network layer.
///
/// `class`, `n_out`, `loss`, and `from` are common to every layer type. Any
/// other key is kept verbatim in [`LayerSpec::options`] for the engine to
/// interpret according to `class`.
///
/// Deserialization goes through [`LayerSpecBuilder`], so it enforces the
/// same checks and defaults `from` to the network input.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawLayerSpec")]
pub struct LayerSpec {
    class: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    n_out: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    loss: Option<String>,
    from: Vec<LayerRef>,
    #[serde(default, flatten)]
    options: BTreeMap<String, Value>,
}

/// Unchecked wire form of [`LayerSpec`].
#[derive(Deserialize)]
struct RawLayerSpec {
    class: String,
    #[serde(default)]
    n_out: Option<usize>,
    #[serde(default)]
    loss: Option<String>,
    #[serde(default)]
    from: Option<Vec<LayerRef>>,
    #[serde(flatten)]
    options: BTreeMap<String, Value>,
}

impl TryFrom<RawLayerSpec> for LayerSpec {
    type Error = ConfigError;

    fn try_from(raw: RawLayerSpec) -> Result<Self> {
        let mut builder = Self::builder(raw.class);
        if let Some(n_out) = raw.n_out {
            builder = builder.n_out(n_out)?;
        }
        if let Some(loss) = raw.loss {
            builder = builder.loss(loss)?;
        }
        if let Some(from) = raw.from {
            builder = builder.from(from);
        }
        raw.options
            .into_iter()
            .fold(builder, |builder, (key, value)| builder.option(key, value))
            .build()
    }
}

impl LayerSpec {
    /// Starts building a layer of the given class.
    #[must_use]
    pub fn builder(class: impl Into<String>) -> LayerSpecBuilder {
        LayerSpecBuilder {
            class: class.into(),
            n_out: None,
            loss: None,
            from: None,
            options: BTreeMap::new(),
        }
    }

    /// Layer-type tag.
    #[must_use]
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Output width, when declared.
    #[must_use]
    pub const fn n_out(&self) -> Option<usize> {
        self.n_out
    }

    /// Training objective tag, when the layer carries a loss.
    #[must_use]
    pub fn loss(&self) -> Option<&str> {
        self.loss.as_deref()
    }

    /// Upstream inputs in declaration order.
    #[must_use]
    pub fn from(&self) -> &[LayerRef] {
        &self.from
    }

    /// Class-specific options not covered by the common keys.
    #[must_use]
    pub fn options(&self) -> &BTreeMap<String, Value> {
        &self.options
    }

    /// Returns a single class-specific option.
    #[must_use]
    pub fn option(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }
}

/// Builder for [`LayerSpec`].
#[derive(Debug)]
pub struct LayerSpecBuilder {
    class: String,
    n_out: Option<usize>,
    loss: Option<String>,
    from: Option<Vec<LayerRef>>,
    options: BTreeMap<String, Value>,
}

impl LayerSpecBuilder {
    /// Sets the output width.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when `n_out` is zero.
    pub fn n_out(mut self, n_out: usize) -> Result<Self> {
        if n_out == 0 {
            return Err(ConfigError::invalid("n_out", "must be a positive integer"));
        }
        self.n_out = Some(n_out);
        Ok(self)
    }

    /// Sets the output width unless one was already declared.
    #[must_use]
    pub fn default_n_out(mut self, n_out: usize) -> Self {
        if self.n_out.is_none() && n_out > 0 {
            self.n_out = Some(n_out);
        }
        self
    }

    /// Sets the training objective.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when the loss tag is empty.
    pub fn loss(mut self, loss: impl Into<String>) -> Result<Self> {
        let loss = loss.into();
        if loss.trim().is_empty() {
            return Err(ConfigError::invalid("loss", "loss tag cannot be empty"));
        }
        self.loss = Some(loss);
        Ok(self)
    }

    /// Returns whether a loss has been set.
    #[must_use]
    pub const fn has_loss(&self) -> bool {
        self.loss.is_some()
    }

    /// Replaces the upstream inputs.
    #[must_use]
    pub fn from(mut self, from: Vec<LayerRef>) -> Self {
        self.from = Some(from);
        self
    }

    /// Appends one upstream input, parsed from its textual form.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if the reference is malformed.
    pub fn add_source(mut self, source: &str) -> Result<Self> {
        let source = source.parse()?;
        self.from.get_or_insert_with(Vec::new).push(source);
        Ok(self)
    }

    /// Adds a class-specific option.
    #[must_use]
    pub fn option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }

    /// Finalises the layer spec. Without explicit sources the layer reads
    /// from the network input.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if the class tag is empty.
    pub fn build(self) -> Result<LayerSpec> {
        if self.class.trim().is_empty() {
            return Err(ConfigError::invalid("class", "layer class cannot be empty"));
        }

        Ok(LayerSpec {
            class: self.class,
            n_out: self.n_out,
            loss: self.loss,
            from: self.from.unwrap_or_else(|| vec![LayerRef::data()]),
            options: self.options,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn builds_output_layer() {
        let layer = LayerSpec::builder("softmax")
            .loss("ce")
            .and_then(|b| b.add_source("fw0"))
            .and_then(LayerSpecBuilder::build)
            .expect("layer");

        assert_eq!(layer.class(), "softmax");
        assert_eq!(layer.loss(), Some("ce"));
        assert_eq!(layer.from().len(), 1);
        assert_eq!(layer.from()[0].to_string(), "fw0");
        assert!(layer.n_out().is_none());
    }

    #[test]
    fn defaults_to_data_input() {
        let layer = LayerSpec::builder("lstm2")
            .n_out(10)
            .and_then(LayerSpecBuilder::build)
            .expect("layer");

        assert_eq!(layer.from(), [LayerRef::data()]);
        assert_eq!(layer.n_out(), Some(10));
    }

    #[test]
    fn explicit_width_wins_over_default() {
        let layer = LayerSpec::builder("softmax")
            .n_out(3)
            .map(|b| b.default_n_out(2))
            .and_then(LayerSpecBuilder::build)
            .expect("layer");
        assert_eq!(layer.n_out(), Some(3));
    }

    #[test]
    fn keeps_class_options() {
        let layer = LayerSpec::builder("rec")
            .option("unit", json!("nativelstm"))
            .option("direction", json!(-1))
            .build()
            .expect("layer");

        assert_eq!(layer.option("unit"), Some(&json!("nativelstm")));
        assert_eq!(layer.options().len(), 2);
    }

    #[test]
    fn rejects_zero_width_and_empty_class() {
        assert!(LayerSpec::builder("linear").n_out(0).is_err());
        assert!(LayerSpec::builder("  ").build().is_err());
    }

    #[test]
    fn deserialization_applies_builder_checks() {
        for text in [
            r#"{"class": "", "n_out": 0, "from": []}"#,
            r#"{"class": "linear", "n_out": 0}"#,
            r#"{"class": "  "}"#,
            r#"{"class": "softmax", "loss": ""}"#,
            r#"{"n_out": 3}"#,
        ] {
            assert!(serde_json::from_str::<LayerSpec>(text).is_err(), "{text}");
        }
    }

    #[test]
    fn deserialization_defaults_to_data_input() {
        let layer: LayerSpec =
            serde_json::from_value(json!({"class": "lstm2", "n_out": 10, "dropout": 0.1}))
                .expect("layer");
        assert_eq!(layer.from(), [LayerRef::data()]);
        assert_eq!(layer.option("dropout"), Some(&json!(0.1)));
    }

    #[test]
    fn serialized_layer_reads_back() {
        let layer = LayerSpec::builder("softmax")
            .loss("ce")
            .and_then(|b| b.add_source("fw0"))
            .and_then(|b| b.add_source("data:classes"))
            .map(|b| b.option("target", json!("classes")))
            .and_then(LayerSpecBuilder::build)
            .expect("layer");

        let value = serde_json::to_value(&layer).unwrap();
        assert_eq!(value["from"], json!(["fw0", "data:classes"]));
        let back: LayerSpec = serde_json::from_value(value).unwrap();
        assert_eq!(back, layer);
    }
}
