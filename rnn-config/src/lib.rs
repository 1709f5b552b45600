//! Training configuration loader facade.
//!
//! Bundles the configuration crates behind feature flags so consumers can
//! depend on the primitives alone or pull in the loader and logging setup.

#![warn(missing_docs, clippy::pedantic)]

/// Re-export shared primitives for convenience.
pub use config_primitives as primitives;

/// Document parsing and validation (enabled by `loader` feature).
#[cfg(feature = "loader")]
pub use config_loader as loader;

/// Logging setup from `log_verbosity` (enabled by `telemetry` feature).
#[cfg(feature = "telemetry")]
pub use config_telemetry as telemetry;

#[cfg(feature = "loader")]
pub use config_loader::{ConfigLoader, ConfigRecord};
pub use config_primitives::{ConfigError, ConfigTypeError, Result};
