//! Typed extraction of options from an untyped document tree.

use std::collections::BTreeMap;

use config_primitives::{ConfigError, ConfigTypeError, Result};
use serde_json::{Map, Value};

/// Human-readable kind of a JSON value, used in type errors.
pub(crate) fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "None",
        Value::Bool(_) => "a boolean",
        Value::Number(n) if n.is_f64() => "a float",
        Value::Number(_) => "an integer",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}

/// Options of one mapping, consumed key by key.
///
/// Keys are reported with their dotted path (`train.num_seqs`) so errors
/// point at the offending option.
#[derive(Debug)]
pub(crate) struct Fields {
    scope: Option<String>,
    map: Map<String, Value>,
}

impl Fields {
    pub(crate) fn root(map: Map<String, Value>) -> Self {
        Self { scope: None, map }
    }

    pub(crate) fn nested(scope: impl Into<String>, map: Map<String, Value>) -> Self {
        Self {
            scope: Some(scope.into()),
            map,
        }
    }

    /// Dotted path of `key` within this scope.
    pub(crate) fn path(&self, key: &str) -> String {
        match &self.scope {
            Some(scope) => format!("{scope}.{key}"),
            None => key.to_owned(),
        }
    }

    pub(crate) fn type_error(&self, key: &str, expected: &'static str, found: &Value) -> ConfigError {
        ConfigTypeError::new(self.path(key), expected, kind(found)).into()
    }

    pub(crate) fn get(&self, key: &str) -> Option<&Value> {
        self.map.get(key).filter(|v| !v.is_null())
    }

    /// Removes `key`; an explicit `None` counts as absent.
    pub(crate) fn take(&mut self, key: &str) -> Option<Value> {
        self.map.remove(key).filter(|v| !v.is_null())
    }

    pub(crate) fn require<T>(&self, key: &str, value: Option<T>) -> Result<T> {
        value.ok_or_else(|| ConfigError::missing(self.path(key)))
    }

    pub(crate) fn string(&mut self, key: &str) -> Result<Option<String>> {
        match self.take(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => Err(self.type_error(key, "a string", &other)),
        }
    }

    pub(crate) fn bool(&mut self, key: &str) -> Result<Option<bool>> {
        match self.take(key) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(b)),
            Some(other) => Err(self.type_error(key, "a boolean", &other)),
        }
    }

    pub(crate) fn int(&mut self, key: &str) -> Result<Option<i64>> {
        match self.take(key) {
            None => Ok(None),
            Some(Value::Number(n)) if n.is_i64() => Ok(n.as_i64()),
            Some(Value::Number(n)) if n.is_u64() => Err(ConfigError::invalid(
                self.path(key),
                format!("{n} is out of range"),
            )),
            Some(other) => Err(self.type_error(key, "an integer", &other)),
        }
    }

    /// An integer that must be strictly positive.
    pub(crate) fn positive(&mut self, key: &str) -> Result<Option<usize>> {
        self.int(key)?
            .map(|n| {
                usize::try_from(n)
                    .ok()
                    .filter(|&n| n > 0)
                    .ok_or_else(|| {
                        ConfigError::invalid(
                            self.path(key),
                            format!("must be a positive integer, got {n}"),
                        )
                    })
            })
            .transpose()
    }

    /// An integer that must not be negative.
    pub(crate) fn non_negative(&mut self, key: &str) -> Result<Option<usize>> {
        self.int(key)?
            .map(|n| {
                usize::try_from(n).map_err(|_| {
                    ConfigError::invalid(
                        self.path(key),
                        format!("must not be negative, got {n}"),
                    )
                })
            })
            .transpose()
    }

    /// A number; integers are widened.
    pub(crate) fn float(&mut self, key: &str) -> Result<Option<f64>> {
        match self.take(key) {
            None => Ok(None),
            Some(Value::Number(n)) => Ok(n.as_f64()),
            Some(other) => Err(self.type_error(key, "a number", &other)),
        }
    }

    pub(crate) fn mapping(&mut self, key: &str) -> Result<Option<Map<String, Value>>> {
        match self.take(key) {
            None => Ok(None),
            Some(Value::Object(map)) => Ok(Some(map)),
            Some(other) => Err(self.type_error(key, "a mapping", &other)),
        }
    }

    /// A list of strings; a single string is accepted as a one-element list.
    pub(crate) fn strings(&mut self, key: &str) -> Result<Option<Vec<String>>> {
        match self.take(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(vec![s])),
            Some(Value::Array(items)) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s),
                    other => Err(self.type_error(key, "a list of strings", &other)),
                })
                .collect::<Result<Vec<_>>>()
                .map(Some),
            Some(other) => Err(self.type_error(key, "a string or a list of strings", &other)),
        }
    }

    /// Everything not consumed so far.
    pub(crate) fn into_rest(self) -> BTreeMap<String, Value> {
        self.map.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn fields(value: Value) -> Fields {
        let Value::Object(map) = value else {
            panic!("test input must be an object");
        };
        Fields::nested("train", map)
    }

    #[test]
    fn reports_dotted_type_errors() {
        let mut f = fields(json!({"num_seqs": "many"}));
        let err = f.positive("num_seqs").expect_err("string");
        assert_eq!(err.key(), Some("train.num_seqs"));
        assert!(matches!(err, ConfigError::Type(_)));
    }

    #[test]
    fn positive_rejects_zero_and_negative() {
        let mut f = fields(json!({"a": 0, "b": -4, "c": 3}));
        assert!(matches!(
            f.positive("a"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            f.positive("b"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert_eq!(f.positive("c").unwrap(), Some(3));
        assert_eq!(f.positive("missing").unwrap(), None);
    }

    #[test]
    fn floats_are_not_integers() {
        let mut f = fields(json!({"n": 9.0}));
        assert!(matches!(f.int("n"), Err(ConfigError::Type(_))));
    }

    #[test]
    fn integers_widen_to_float() {
        let mut f = fields(json!({"clip": 0, "lr": 0.5}));
        assert_eq!(f.float("clip").unwrap(), Some(0.0));
        assert_eq!(f.float("lr").unwrap(), Some(0.5));
    }

    #[test]
    fn none_counts_as_absent() {
        let mut f = fields(json!({"model": null}));
        assert_eq!(f.string("model").unwrap(), None);
        assert!(f.into_rest().is_empty());
    }

    #[test]
    fn strings_accepts_single_value() {
        let mut f = fields(json!({"from": "fw0", "to": ["a", "b"], "bad": [1]}));
        assert_eq!(f.strings("from").unwrap(), Some(vec!["fw0".to_owned()]));
        assert_eq!(f.strings("to").unwrap().map(|v| v.len()), Some(2));
        assert!(f.strings("bad").is_err());
    }

    #[test]
    fn rest_keeps_unconsumed_keys() {
        let mut f = fields(json!({"class": "Task12AXDataset", "seq_len": 30}));
        f.string("class").unwrap();
        let rest = f.into_rest();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest["seq_len"], json!(30));
    }
}
