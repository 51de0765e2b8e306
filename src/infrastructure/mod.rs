//! Infrastructure layer module
//!
//! - Configuration management (figment)
//! - Logging infrastructure (tracing-subscriber, tracing-appender)
//! - Project setup

pub mod config;
pub mod logging;
pub mod setup;
