//! Migration Definitions - Core types and structures for migrations
//!
//! Defines the registry record, the audit record, and the two closed
//! enumerations (direction and status) that drive the apply protocol.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// A registered migration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Migration {
    /// Generated by the store when the migration is registered
    pub id: Uuid,
    /// Unix timestamp at creation; doubles as the directory name
    pub name: String,
    /// When the migration was registered
    pub created_at: DateTime<Utc>,
    /// Whether the up script is currently in effect
    pub status: MigrationStatus,
}

impl Migration {
    pub fn is_applied(&self) -> bool {
        self.status == MigrationStatus::Applied
    }
}

/// One successful execution of an up or down script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationQuery {
    pub id: Uuid,
    pub migration_id: Uuid,
    /// Script text exactly as it was executed
    pub query_text: String,
    pub direction: MigrationDirection,
    pub executed_at: DateTime<Utc>,
}

/// Migration direction for execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MigrationDirection {
    /// Apply the migration (run up.sql)
    Up,
    /// Revert the migration (run down.sql)
    Down,
}

impl MigrationDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            MigrationDirection::Up => "UP",
            MigrationDirection::Down => "DOWN",
        }
    }

    /// Status a migration must have to be pending in this direction
    pub fn pending_status(&self) -> MigrationStatus {
        match self {
            MigrationDirection::Up => MigrationStatus::Pending,
            MigrationDirection::Down => MigrationStatus::Applied,
        }
    }

    /// Status a migration ends up with once its script ran
    pub fn resulting_status(&self) -> MigrationStatus {
        match self {
            MigrationDirection::Up => MigrationStatus::Applied,
            MigrationDirection::Down => MigrationStatus::Pending,
        }
    }

    /// Script file holding this direction's SQL
    pub fn script_file(&self) -> &'static str {
        match self {
            MigrationDirection::Up => "up.sql",
            MigrationDirection::Down => "down.sql",
        }
    }

    /// Placeholder written into a freshly scaffolded script
    pub fn placeholder(&self) -> &'static str {
        match self {
            MigrationDirection::Up => "-- Write your UP migration here\n\n",
            MigrationDirection::Down => "-- Write your DOWN migration here\n\n",
        }
    }
}

impl fmt::Display for MigrationDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MigrationDirection {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "UP" => Ok(MigrationDirection::Up),
            "DOWN" => Ok(MigrationDirection::Down),
            _ => Err(ParseEnumError {
                value: s.to_string(),
                expected: "UP, DOWN",
            }),
        }
    }
}

/// Migration status in the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MigrationStatus {
    /// Registered but its up script is not in effect
    Pending,
    /// Up script executed and not rolled back
    Applied,
}

impl MigrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MigrationStatus::Pending => "PENDING",
            MigrationStatus::Applied => "APPLIED",
        }
    }
}

impl fmt::Display for MigrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MigrationStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(MigrationStatus::Pending),
            "APPLIED" => Ok(MigrationStatus::Applied),
            _ => Err(ParseEnumError {
                value: s.to_string(),
                expected: "PENDING, APPLIED",
            }),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid value '{value}', expected one of: {expected}")]
pub struct ParseEnumError {
    value: String,
    expected: &'static str,
}

/// Result of one apply run
#[derive(Debug, Clone)]
pub struct MigrationRunResult {
    pub direction: MigrationDirection,
    /// Names of the migrations applied, in the order they ran
    pub applied_migrations: Vec<String>,
    /// Total execution time in milliseconds
    pub execution_time_ms: u128,
}

impl MigrationRunResult {
    pub fn applied_count(&self) -> usize {
        self.applied_migrations.len()
    }
}

/// Progress reported while an apply run walks its migrations
#[derive(Debug, Clone, Copy)]
pub enum ApplyProgress<'a> {
    Started(&'a Migration, MigrationDirection),
    Applied(&'a Migration, MigrationDirection),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_status_mapping() {
        assert_eq!(MigrationDirection::Up.pending_status(), MigrationStatus::Pending);
        assert_eq!(MigrationDirection::Up.resulting_status(), MigrationStatus::Applied);
        assert_eq!(MigrationDirection::Down.pending_status(), MigrationStatus::Applied);
        assert_eq!(MigrationDirection::Down.resulting_status(), MigrationStatus::Pending);
    }

    #[test]
    fn test_parse_direction() {
        assert_eq!("UP".parse::<MigrationDirection>().unwrap(), MigrationDirection::Up);
        assert_eq!("down".parse::<MigrationDirection>().unwrap(), MigrationDirection::Down);

        let err = "sideways".parse::<MigrationDirection>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid value 'sideways', expected one of: UP, DOWN"
        );
    }

    #[test]
    fn test_parse_status() {
        assert_eq!("APPLIED".parse::<MigrationStatus>().unwrap(), MigrationStatus::Applied);
        assert_eq!(MigrationStatus::Pending.to_string(), "PENDING");
        assert!("DONE".parse::<MigrationStatus>().is_err());
    }
}
