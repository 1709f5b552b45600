//! Checkpoint path templates with document-name substitution.

use std::fmt;

use config_primitives::{ConfigError, Result};
use serde::{Serialize, Serializer};

#[derive(Clone, Debug, PartialEq)]
enum Segment {
    Literal(String),
    Name,
}

/// A checkpoint path pattern such as `/tmp/returnn.%s.network`.
///
/// `%s` is replaced by the document name and `%%` produces a literal `%`.
/// Any other `%` sequence is rejected when the template is parsed, so
/// rendering cannot fail.
///
/// # Examples
///
/// ```
/// use config_loader::ModelPathTemplate;
///
/// let template = ModelPathTemplate::parse("/tmp/returnn.%s.network").unwrap();
/// assert_eq!(
///     template.render("demo-upd-mult-model.lstm.12ax"),
///     "/tmp/returnn.demo-upd-mult-model.lstm.12ax.network"
/// );
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct ModelPathTemplate {
    template: String,
    segments: Vec<Segment>,
}

impl ModelPathTemplate {
    /// Parses a template string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for an empty template or an
    /// unsupported `%` sequence.
    pub fn parse(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        if template.trim().is_empty() {
            return Err(ConfigError::invalid("model", "path template cannot be empty"));
        }
        let segments = segments(&template)?;
        Ok(Self { template, segments })
    }

    /// Returns the raw template string.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Whether the template refers to the document name at all.
    #[must_use]
    pub fn has_placeholder(&self) -> bool {
        self.segments.contains(&Segment::Name)
    }

    /// Substitutes every placeholder with `name`.
    #[must_use]
    pub fn render(&self, name: &str) -> String {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Literal(text) => text.as_str(),
                Segment::Name => name,
            })
            .collect()
    }

    /// Path of the checkpoint written after `epoch`, using the engine's
    /// zero-padded `.NNN` suffix.
    #[must_use]
    pub fn render_epoch(&self, name: &str, epoch: usize) -> String {
        format!("{}.{epoch:03}", self.render(name))
    }
}

fn segments(template: &str) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = template.chars();

    while let Some(ch) = chars.next() {
        if ch != '%' {
            literal.push(ch);
            continue;
        }
        match chars.next() {
            Some('%') => literal.push('%'),
            Some('s') => {
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Name);
            }
            Some(other) => {
                return Err(ConfigError::invalid(
                    "model",
                    format!("unsupported placeholder `%{other}` (only `%s` and `%%` are allowed)"),
                ));
            }
            None => {
                return Err(ConfigError::invalid(
                    "model",
                    "template ends with a lone `%`",
                ));
            }
        }
    }
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

impl fmt::Display for ModelPathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.template)
    }
}

impl Serialize for ModelPathTemplate {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.template)
    }
}
