//! authgate core - configuration shared by the store and API crates
//!
//! The whole process is configured through a single [`AppConfig`] that is
//! built once at startup and handed to every component that needs it.

pub mod config;

pub use config::{
    AppConfig, AuthConfig, ConfigError, DatabaseConfig, LoggingConfig, ServerConfig,
    StoreBackend,
};
