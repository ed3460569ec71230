//! Configuration shared by every dbmigo command.
//!
//! A config file names the migrations directory and the database to migrate.
//! It is loaded once per invocation and handed to the commands as a plain
//! value; nothing here is global.

pub mod sources;
pub mod validation;

pub use sources::*;
pub use validation::*;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Config file written by `init` and read by default by the other commands
pub const DEFAULT_CONFIG_FILE: &str = "dbmigo.config.yaml";

/// Migrations directory used when `init` is not given one
pub const DEFAULT_MIGRATIONS_DIR: &str = "migrations";

const CONFIG_TEMPLATE: &str = "migrations_dir: $MIGRATIONS_DIR\ndb_url: $DB_URL\n";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub migrations_dir: String,
    #[serde(default)]
    pub db_url: String,
}

impl Config {
    pub fn new(migrations_dir: impl Into<String>, db_url: impl Into<String>) -> Self {
        Self {
            migrations_dir: migrations_dir.into(),
            db_url: db_url.into(),
        }
    }

    /// Read and validate a config file.
    ///
    /// Both fields must be present; missing ones are reported together.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let format = ConfigFormat::from_path(path);
        tracing::debug!(path = %path.display(), %format, "loading config");

        let config = Self::parse(&content, format)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse config content without validating it
    pub fn parse(content: &str, format: ConfigFormat) -> ConfigResult<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config = match format {
            ConfigFormat::Yaml => serde_yaml::from_str(content)?,
            ConfigFormat::Json => serde_json::from_str(content)?,
        };
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        RequiredFieldsValidator.validate(self)
    }

    pub fn migrations_path(&self) -> PathBuf {
        PathBuf::from(&self.migrations_dir)
    }

    /// Render the file `init` writes out
    pub fn render(&self) -> String {
        CONFIG_TEMPLATE
            .replacen("$MIGRATIONS_DIR", &self.migrations_dir, 1)
            .replacen("$DB_URL", &self.db_url, 1)
    }

    /// Write the rendered config to `path`, failing if the file exists
    pub fn write_new(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        use std::io::Write;

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path.as_ref())?;
        file.write_all(self.render().as_bytes())?;
        Ok(())
    }
}
