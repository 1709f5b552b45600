//! Line-oriented documents: `key value` per line. A value starting with `{`
//! or `[` is read as inline JSON, which is how nested options such as the
//! network are written in this form.

use config_primitives::{ConfigError, Result};
use serde_json::{Number, Value};

use super::Document;

pub(super) fn parse(text: &str) -> Result<Document> {
    let mut doc = Document::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once(char::is_whitespace) else {
            return Err(ConfigError::syntax(
                idx + 1,
                format!("missing value for `{line}`"),
            ));
        };
        let value = value.trim();
        let value = if value.starts_with(['{', '[']) {
            serde_json::from_str(value)
                .map_err(|err| ConfigError::syntax(idx + 1, format!("`{key}`: {err}")))?
        } else {
            scalar(value)
        };
        doc.insert(key.to_owned(), value);
    }
    Ok(doc)
}

fn scalar(text: &str) -> Value {
    if text.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if text.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    if let Ok(int) = text.parse::<i64>() {
        return Value::from(int);
    }
    if let Some(float) = text.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(float);
    }
    Value::String(text.to_owned())
}
