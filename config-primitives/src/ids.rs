//! Layer identifiers and upstream references.

use std::borrow::Borrow;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

const MAX_NAME_LEN: usize = 128;

/// Name reserved for the network's external input.
pub const DATA_INPUT: &str = "data";

/// Name of a layer in the declared network graph.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LayerName(String);

impl LayerName {
    /// Creates a layer name after validating its format.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if the name is empty, too long,
    /// reserved, or contains characters that clash with reference syntax.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self(name))
    }

    /// Returns the layer name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for LayerName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for LayerName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for LayerName {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<LayerName> for String {
    fn from(value: LayerName) -> Self {
        value.0
    }
}

impl PartialEq<str> for LayerName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for LayerName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(ConfigError::invalid("network", "layer name cannot be empty"));
    }

    if name.len() > MAX_NAME_LEN {
        return Err(ConfigError::invalid(
            "network",
            format!("layer name `{name}` is longer than {MAX_NAME_LEN} characters"),
        ));
    }

    if name == DATA_INPUT {
        return Err(ConfigError::invalid(
            "network",
            format!("layer name `{DATA_INPUT}` is reserved for the network input"),
        ));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/'))
    {
        return Err(ConfigError::invalid(
            "network",
            format!(
                "layer name `{name}` must contain only alphanumeric, underscore, dash, dot, or slash"
            ),
        ));
    }

    Ok(())
}

/// One entry of a layer's `from` list.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LayerRef {
    /// The network input, optionally a named data stream (`data:classes`).
    Data {
        /// Data stream key after the `data:` prefix.
        key: Option<String>,
    },
    /// Another layer of the same network.
    Layer(LayerName),
}

impl LayerRef {
    /// Reference to the default network input.
    #[must_use]
    pub const fn data() -> Self {
        Self::Data { key: None }
    }

    /// Returns the referenced layer, or `None` for data inputs.
    #[must_use]
    pub const fn layer(&self) -> Option<&LayerName> {
        match self {
            Self::Layer(name) => Some(name),
            Self::Data { .. } => None,
        }
    }
}

impl Display for LayerRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Data { key: None } => f.write_str(DATA_INPUT),
            Self::Data { key: Some(key) } => write!(f, "{DATA_INPUT}:{key}"),
            Self::Layer(name) => Display::fmt(name, f),
        }
    }
}

impl FromStr for LayerRef {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        if s == DATA_INPUT {
            return Ok(Self::data());
        }
        if let Some(key) = s.strip_prefix("data:") {
            if key.is_empty() {
                return Err(ConfigError::invalid(
                    "network",
                    "data reference `data:` is missing its stream key",
                ));
            }
            return Ok(Self::Data {
                key: Some(key.to_owned()),
            });
        }
        LayerName::new(s).map(Self::Layer)
    }
}

impl TryFrom<String> for LayerRef {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<LayerRef> for String {
    fn from(value: LayerRef) -> Self {
        value.to_string()
    }
}
