//! Error types for the migration engine, store and script resolver

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for migration operations
pub type MigrationResult<T> = Result<T, MigrationError>;

const FOREIGN_KEY_VIOLATION: &str = "23503";
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Could not connect to the database: {0}")]
    Connection(String),

    #[error("{} not found for migration {name}", .path.display())]
    ScriptMissing { name: String, path: PathBuf },

    #[error("Error reading {} for migration {name}: {source}", .path.display())]
    ScriptRead {
        name: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Error scaffolding migration {name}: {source}")]
    Scaffold {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("Migration {name} already exists")]
    DuplicateName { name: String },

    #[error("Migration {name} is not registered")]
    NotRegistered { name: String },

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Migration {name} failed: {cause}")]
    ApplyFailed { name: String, cause: String },

    #[error("Database error: {0}")]
    Database(String),
}

impl MigrationError {
    pub fn apply_failed(name: impl Into<String>, cause: impl ToString) -> Self {
        Self::ApplyFailed {
            name: name.into(),
            cause: cause.to_string(),
        }
    }

    pub fn duplicate_name(name: impl Into<String>) -> Self {
        Self::DuplicateName { name: name.into() }
    }

    /// Name of the migration the error is about, when there is one
    pub fn migration_name(&self) -> Option<&str> {
        match self {
            Self::ScriptMissing { name, .. }
            | Self::ScriptRead { name, .. }
            | Self::Scaffold { name, .. }
            | Self::DuplicateName { name }
            | Self::NotRegistered { name }
            | Self::ApplyFailed { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

impl From<sqlx::Error> for MigrationError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Configuration(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => MigrationError::Connection(err.to_string()),
            sqlx::Error::Database(db) => match db.code().as_deref() {
                Some(FOREIGN_KEY_VIOLATION) | Some(UNIQUE_VIOLATION) => {
                    MigrationError::ConstraintViolation(db.message().to_string())
                }
                _ => MigrationError::Database(err.to_string()),
            },
            _ => MigrationError::Database(err.to_string()),
        }
    }
}

impl From<dbmigo_core::ConfigError> for MigrationError {
    fn from(err: dbmigo_core::ConfigError) -> Self {
        MigrationError::InvalidConfig(err.to_string())
    }
}
