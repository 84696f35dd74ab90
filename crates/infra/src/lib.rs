//! Infrastructure layer: configuration and the Redis revocation backend.

pub mod config;
pub mod revocation;

pub use config::{AppConfig, ConfigError, load_permission_table};
