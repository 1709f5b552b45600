//! JSON documents.

use config_primitives::{ConfigError, Result};
use serde_json::Value;

use super::Document;

pub(super) fn parse(text: &str) -> Result<Document> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ConfigError::syntax(1, "top-level JSON value must be an object")),
        Err(err) => Err(ConfigError::syntax(err.line(), err.to_string())),
    }
}
