//! # dbmigo-migrations: migration engine for PostgreSQL
//!
//! Migrations are directories of `up.sql`/`down.sql` pairs named after the
//! Unix time they were created at. Their state lives in two tables inside
//! the migrated database: a registry (`PENDING`/`APPLIED`) and an audit log
//! of every script executed.
//!
//! - [`ScriptResolver`] reads and scaffolds the script pairs
//! - [`MigrationStore`] is the repository the engine drives, with
//!   [`PgMigrationStore`] as its PostgreSQL implementation
//! - [`MigrationEngine`] lists pending migrations and applies them

pub mod definitions;
pub mod error;
pub mod resolver;
pub mod runner;
pub mod store;

pub use definitions::*;
pub use error::*;
pub use resolver::ScriptResolver;
pub use runner::MigrationEngine;
pub use store::{MigrationStore, PgMigrationStore};

use dbmigo_core::Config;

/// Build an engine over a fresh connection to the configured database
pub async fn connect(config: &Config) -> MigrationResult<MigrationEngine<PgMigrationStore>> {
    config.validate()?;
    let store = PgMigrationStore::connect(&config.db_url).await?;
    Ok(MigrationEngine::new(
        store,
        ScriptResolver::new(config.migrations_path()),
    ))
}
