//! Configuration and logging

pub mod config;
pub mod logging;

pub use config::{BeaconConfig, ConfigError, IngestConfig, ServiceConfig};
pub use logging::{init_logging, LogConfig, LogFormat, LogLevel};
