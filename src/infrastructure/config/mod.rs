//! Loading `.devloop/` configuration.
//!
//! Defaults, then `config.yaml`, then `local.yaml`, then `DEVLOOP_*`
//! environment variables, merged with figment and validated once.

pub mod loader;

pub use loader::{ConfigError, ConfigLoader};
