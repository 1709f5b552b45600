//! Core shared types for training configuration documents.

#![warn(missing_docs, clippy::pedantic)]

mod chunking;
mod error;
mod ids;
mod layer;
mod options;

/// Sequence chunking settings.
pub use chunking::Chunking;
/// Error types and result alias shared across the configuration crates.
pub use error::{ConfigError, ConfigTypeError, Result};
/// Layer identifiers and upstream references.
pub use ids::{DATA_INPUT, LayerName, LayerRef};
/// Declared layer shapes.
pub use layer::{LayerSpec, LayerSpecBuilder};
/// Enumerated option values.
pub use options::{Batching, Task};
