//! Shared error definitions for configuration loading.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the configuration crates.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// An option was present but held a value of the wrong type.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("option `{key}` must be {expected}, found {found}")]
pub struct ConfigTypeError {
    key: String,
    expected: &'static str,
    found: &'static str,
}

impl ConfigTypeError {
    /// Creates a type error for `key`.
    #[must_use]
    pub fn new(key: impl Into<String>, expected: &'static str, found: &'static str) -> Self {
        Self {
            key: key.into(),
            expected,
            found,
        }
    }

    /// Returns the dotted name of the offending option.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the expected value kind.
    #[must_use]
    pub const fn expected(&self) -> &'static str {
        self.expected
    }

    /// Returns the value kind actually found in the document.
    #[must_use]
    pub const fn found(&self) -> &'static str {
        self.found
    }
}

/// Errors that can occur while loading or validating a configuration document.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required option was absent.
    #[error("missing required option `{key}`")]
    Missing {
        /// Dotted name of the missing option.
        key: String,
    },

    /// An option held a value of the wrong type.
    #[error(transparent)]
    Type(#[from] ConfigTypeError),

    /// An option had the right type but an unacceptable value.
    #[error("invalid value for `{key}`: {reason}")]
    InvalidValue {
        /// Dotted name of the offending option.
        key: String,
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// The document text could not be parsed.
    #[error("syntax error on line {line}: {reason}")]
    Syntax {
        /// One-based line number where parsing failed.
        line: usize,
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// The document could not be read from disk.
    #[error("failed to read `{}`: {source}", path.display())]
    Io {
        /// Path that was being read.
        path: PathBuf,
        /// Source [`std::io::Error`].
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Helper to construct [`ConfigError::Missing`].
    #[must_use]
    pub fn missing(key: impl Into<String>) -> Self {
        Self::Missing { key: key.into() }
    }

    /// Helper to construct [`ConfigError::InvalidValue`].
    #[must_use]
    pub fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Helper to construct [`ConfigError::Syntax`].
    #[must_use]
    pub fn syntax(line: usize, reason: impl Into<String>) -> Self {
        Self::Syntax {
            line,
            reason: reason.into(),
        }
    }

    /// Returns the option the error refers to, when there is one.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Missing { key } | Self::InvalidValue { key, .. } => Some(key),
            Self::Type(err) => Some(err.key()),
            Self::Syntax { .. } | Self::Io { .. } => None,
        }
    }
}
