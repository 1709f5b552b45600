//! Loading and validation of training configuration documents.
//!
//! A document is parsed by one of the [`syntax`] front-ends into an untyped
//! option tree, then [`ConfigLoader`] extracts the typed [`ConfigRecord`],
//! applying defaults and rejecting missing, mistyped, or inconsistent
//! options with a [`ConfigError`] that names the offending key.

#![warn(missing_docs, clippy::pedantic)]

mod fields;
pub mod loader;
pub mod network;
pub mod schema;
pub mod syntax;
pub mod template;

/// Errors surfaced while loading.
pub use config_primitives::{ConfigError, ConfigTypeError, Result};
/// Document loader.
pub use loader::{ConfigLoader, declared_log_verbosity, document_name, read_path};
/// Validated network graph.
pub use network::Network;
/// Typed configuration record.
pub use schema::{ConfigRecord, DatasetSpec, OptimizerSettings};
/// Document syntaxes.
pub use syntax::Syntax;
/// Checkpoint path templates.
pub use template::ModelPathTemplate;
