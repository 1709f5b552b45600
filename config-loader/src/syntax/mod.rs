//! Front-ends for the document syntaxes accepted by the training engine.
//!
//! Every front-end produces the same intermediate tree: a JSON object mapping
//! option names to values. Typed extraction happens afterwards in
//! [`crate::loader`].

mod json;
mod lines;
mod script;

use config_primitives::Result;
use serde_json::{Map, Value};

/// Untyped option tree produced by a syntax front-end.
pub type Document = Map<String, Value>;

/// Surface syntax of a configuration document.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Syntax {
    /// A single JSON object.
    Json,
    /// `#!` header followed by `key = literal` assignments.
    Script,
    /// One `key value` pair per line.
    Lines,
}

impl Syntax {
    /// Chooses a syntax from the first non-blank characters of `text`.
    #[must_use]
    pub fn detect(text: &str) -> Self {
        let text = text.trim_start();
        if text.starts_with('{') {
            Self::Json
        } else if text.starts_with("#!") {
            Self::Script
        } else {
            Self::Lines
        }
    }

    /// Parses `text` in this syntax.
    ///
    /// # Errors
    ///
    /// Returns [`config_primitives::ConfigError::Syntax`] when the text is
    /// malformed.
    pub fn parse(self, text: &str) -> Result<Document> {
        match self {
            Self::Json => json::parse(text),
            Self::Script => script::parse(text),
            Self::Lines => lines::parse(text),
        }
    }
}

/// Detects the syntax of `text` and parses it.
///
/// # Errors
///
/// Returns [`config_primitives::ConfigError::Syntax`] when the text is
/// malformed.
pub fn parse_document(text: &str) -> Result<(Syntax, Document)> {
    let syntax = Syntax::detect(text);
    syntax.parse(text).map(|doc| (syntax, doc))
}
