//! Configuration shared by the dbmigo crates

pub mod config;

pub use config::{
    apply_ssl_mode, validate_connection_string, Config, ConfigError, ConfigFormat, ConfigResult,
    ConfigValidator, DEFAULT_CONFIG_FILE, DEFAULT_MIGRATIONS_DIR,
};
