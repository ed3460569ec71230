//! Logging setup for the dbmigo binary
//!
//! Diagnostics go to stderr so they never mix with command output on
//! stdout. `RUST_LOG` overrides the level chosen here.

use std::io;

use tracing_subscriber::{fmt::Layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logging configuration for the CLI
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "warn", "debug")
    pub level: String,
    /// Emit one JSON object per event instead of plain text
    pub json_format: bool,
    /// Environment filter (e.g. "dbmigo_migrations=debug,sqlx=warn")
    pub env_filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json_format: false,
            env_filter: None,
        }
    }
}

impl LoggingConfig {
    /// `warn` by default, debug output of the dbmigo crates with `--verbose`.
    ///
    /// `DBMIGO_LOG_FORMAT=json` switches to JSON lines.
    pub fn for_cli(verbose: bool) -> Self {
        let json_format = std::env::var("DBMIGO_LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let config = Self {
            json_format,
            ..Self::default()
        };

        if verbose {
            config.with_env_filter("warn,dbmigo=debug,dbmigo_migrations=debug,dbmigo_core=debug")
        } else {
            config
        }
    }

    pub fn with_env_filter<S: Into<String>>(mut self, filter: S) -> Self {
        self.env_filter = Some(filter.into());
        self
    }
}

/// Install the global subscriber
pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = config.env_filter.as_deref().unwrap_or(&config.level);

    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(env_filter))?;

    if config.json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(Layer::new().with_writer(io::stderr).json())
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(Layer::new().with_writer(io::stderr).with_target(false))
            .try_init()?;
    }

    tracing::debug!(
        level = %config.level,
        format = if config.json_format { "json" } else { "text" },
        "logging initialized"
    );
    Ok(())
}
