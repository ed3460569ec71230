//! Migration Store - bookkeeping of migration status and audit history
//!
//! The engine only talks to the [`MigrationStore`] trait, so the SQL dialect
//! lives entirely in the implementations.

use async_trait::async_trait;
use uuid::Uuid;

use crate::definitions::{Migration, MigrationDirection, MigrationQuery, MigrationStatus};
use crate::error::MigrationResult;

pub mod postgres;

pub use postgres::PgMigrationStore;

/// Repository the migration engine drives
#[async_trait]
pub trait MigrationStore: Send {
    /// Create the tracking tables and enum types.
    ///
    /// The status type is dropped and recreated, so this belongs to a fresh
    /// workspace, before any migration is registered.
    async fn provision(&mut self) -> MigrationResult<()>;

    /// Insert a `Pending` migration; `DuplicateName` if the name is taken
    async fn register_migration(&mut self, name: &str) -> MigrationResult<Migration>;

    /// Migrations with `status`, oldest first
    async fn list_by_status(&mut self, status: MigrationStatus) -> MigrationResult<Vec<Migration>>;

    /// Every registered migration, oldest first
    async fn list_all(&mut self) -> MigrationResult<Vec<Migration>>;

    /// Audit rows of one migration, oldest first
    async fn list_queries(&mut self, migration_id: Uuid) -> MigrationResult<Vec<MigrationQuery>>;

    /// Append an audit row and flip the migration's status, atomically
    async fn record_application(
        &mut self,
        migration: &Migration,
        query_text: &str,
        direction: MigrationDirection,
    ) -> MigrationResult<()>;

    /// Execute `script` and record it in a single transaction.
    ///
    /// Errors raised by the script itself are reported as `ApplyFailed`; on
    /// any error nothing is committed.
    async fn apply_script(
        &mut self,
        migration: &Migration,
        script: &str,
        direction: MigrationDirection,
    ) -> MigrationResult<()>;

    /// Keep other dbmigo processes from applying at the same time
    async fn lock(&mut self) -> MigrationResult<()> {
        Ok(())
    }

    async fn unlock(&mut self) -> MigrationResult<()> {
        Ok(())
    }
}
