//! PostgreSQL implementation of the migration store
//!
//! One connection per command invocation; no pool. The tables and enum types
//! are prefixed with `_dbmigo_` so they stay out of the way of application
//! schemas.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Connection, Executor, PgConnection};
use uuid::Uuid;

use super::MigrationStore;
use crate::definitions::{Migration, MigrationDirection, MigrationQuery, MigrationStatus};
use crate::error::{MigrationError, MigrationResult};

/// Key of the session-level advisory lock held while applying
const APPLY_LOCK_KEY: i64 = 0x6462_6d69_676f;

const UNIQUE_VIOLATION: &str = "23505";

/// Safe to run again on a provisioned database: existing types, tables and rows
/// are kept.
pub const PROVISION_SQL: &str = r#"
do $$ begin
  create type _dbmigo_migration_status as enum ('PENDING', 'APPLIED');
exception when duplicate_object then null;
end $$;

do $$ begin
  create type _dbmigo_migration_type as enum ('UP', 'DOWN');
exception when duplicate_object then null;
end $$;

create table if not exists _dbmigo_migrations (
  migration_id uuid primary key default gen_random_uuid(),
  migration_name text not null,
  migration_time timestamp with time zone not null default now(),
  migration_status _dbmigo_migration_status not null default 'PENDING'
);

create table if not exists _dbmigo_migration_queries (
  migration_query_id uuid primary key default gen_random_uuid(),
  migration_id uuid not null,
  migration_query text not null,
  migration_type _dbmigo_migration_type not null,
  query_time timestamp with time zone not null default now()
);

alter table _dbmigo_migrations drop constraint if exists uq_migration_name;
alter table _dbmigo_migrations add constraint uq_migration_name unique (migration_name);

alter table _dbmigo_migration_queries drop constraint if exists fk_migration_id;
alter table _dbmigo_migration_queries add constraint fk_migration_id foreign key (migration_id) references _dbmigo_migrations(migration_id);
"#;

const MIGRATION_COLUMNS: &str =
    "migration_id, migration_name, migration_time, migration_status::text as migration_status";

#[derive(Debug, sqlx::FromRow)]
struct MigrationRow {
    migration_id: Uuid,
    migration_name: String,
    migration_time: DateTime<Utc>,
    migration_status: String,
}

impl TryFrom<MigrationRow> for Migration {
    type Error = MigrationError;

    fn try_from(row: MigrationRow) -> Result<Self, Self::Error> {
        let status = row
            .migration_status
            .parse::<MigrationStatus>()
            .map_err(|e| MigrationError::Database(e.to_string()))?;

        Ok(Migration {
            id: row.migration_id,
            name: row.migration_name,
            created_at: row.migration_time,
            status,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MigrationQueryRow {
    migration_query_id: Uuid,
    migration_id: Uuid,
    migration_query: String,
    migration_type: String,
    query_time: DateTime<Utc>,
}

impl TryFrom<MigrationQueryRow> for MigrationQuery {
    type Error = MigrationError;

    fn try_from(row: MigrationQueryRow) -> Result<Self, Self::Error> {
        let direction = row
            .migration_type
            .parse::<MigrationDirection>()
            .map_err(|e| MigrationError::Database(e.to_string()))?;

        Ok(MigrationQuery {
            id: row.migration_query_id,
            migration_id: row.migration_id,
            query_text: row.migration_query,
            direction,
            executed_at: row.query_time,
        })
    }
}

/// Migration store backed by a single PostgreSQL connection
pub struct PgMigrationStore {
    conn: PgConnection,
}

impl PgMigrationStore {
    pub fn new(conn: PgConnection) -> Self {
        Self { conn }
    }

    /// Open the connection this store uses for its whole lifetime
    pub async fn connect(database_url: &str) -> MigrationResult<Self> {
        let conn = PgConnection::connect(database_url)
            .await
            .map_err(|e| MigrationError::Connection(e.to_string()))?;
        tracing::debug!("connected to migration database");
        Ok(Self::new(conn))
    }

    /// Close the connection explicitly instead of dropping it
    pub async fn close(self) -> MigrationResult<()> {
        self.conn.close().await?;
        Ok(())
    }

    /// Run a multi-statement SQL batch outside of any transaction
    pub async fn execute_batch(&mut self, sql: &str) -> MigrationResult<()> {
        (&mut self.conn).execute(sql).await?;
        Ok(())
    }

    async fn fetch_migrations(
        &mut self,
        status: Option<MigrationStatus>,
    ) -> MigrationResult<Vec<Migration>> {
        let rows: Vec<MigrationRow> = match status {
            Some(status) => {
                let sql = format!(
                    "select {} from _dbmigo_migrations \
                     where migration_status = $1::_dbmigo_migration_status \
                     order by migration_time asc, migration_name asc",
                    MIGRATION_COLUMNS
                );
                sqlx::query_as(&sql)
                    .bind(status.as_str())
                    .fetch_all(&mut self.conn)
                    .await?
            }
            None => {
                let sql = format!(
                    "select {} from _dbmigo_migrations \
                     order by migration_time asc, migration_name asc",
                    MIGRATION_COLUMNS
                );
                sqlx::query_as(&sql).fetch_all(&mut self.conn).await?
            }
        };

        rows.into_iter().map(Migration::try_from).collect()
    }
}

/// Audit insert plus status flip on an open transaction
async fn record_in(
    conn: &mut PgConnection,
    migration: &Migration,
    query_text: &str,
    direction: MigrationDirection,
) -> MigrationResult<()> {
    sqlx::query(
        "insert into _dbmigo_migration_queries \
         (migration_query_id, migration_id, migration_query, migration_type) \
         values ($1, $2, $3, $4::_dbmigo_migration_type)",
    )
    .bind(Uuid::new_v4())
    .bind(migration.id)
    .bind(query_text)
    .bind(direction.as_str())
    .execute(&mut *conn)
    .await?;

    let updated = sqlx::query(
        "update _dbmigo_migrations \
         set migration_status = $2::_dbmigo_migration_status \
         where migration_id = $1",
    )
    .bind(migration.id)
    .bind(direction.resulting_status().as_str())
    .execute(&mut *conn)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(MigrationError::ConstraintViolation(format!(
            "migration {} ({}) is not registered",
            migration.name, migration.id
        )));
    }
    Ok(())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION))
}

#[async_trait]
impl MigrationStore for PgMigrationStore {
    async fn provision(&mut self) -> MigrationResult<()> {
        self.execute_batch(PROVISION_SQL).await?;
        tracing::info!("provisioned migration tables");
        Ok(())
    }

    async fn register_migration(&mut self, name: &str) -> MigrationResult<Migration> {
        let sql = format!(
            "insert into _dbmigo_migrations (migration_id, migration_name) \
             values ($1, $2) returning {}",
            MIGRATION_COLUMNS
        );
        let row: MigrationRow = sqlx::query_as(&sql)
            .bind(Uuid::new_v4())
            .bind(name)
            .fetch_one(&mut self.conn)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    MigrationError::duplicate_name(name)
                } else {
                    MigrationError::from(e)
                }
            })?;

        row.try_into()
    }

    async fn list_by_status(&mut self, status: MigrationStatus) -> MigrationResult<Vec<Migration>> {
        self.fetch_migrations(Some(status)).await
    }

    async fn list_all(&mut self) -> MigrationResult<Vec<Migration>> {
        self.fetch_migrations(None).await
    }

    async fn list_queries(&mut self, migration_id: Uuid) -> MigrationResult<Vec<MigrationQuery>> {
        let rows: Vec<MigrationQueryRow> = sqlx::query_as(
            "select migration_query_id, migration_id, migration_query, \
             migration_type::text as migration_type, query_time \
             from _dbmigo_migration_queries where migration_id = $1 \
             order by query_time asc",
        )
        .bind(migration_id)
        .fetch_all(&mut self.conn)
        .await?;

        rows.into_iter().map(MigrationQuery::try_from).collect()
    }

    async fn record_application(
        &mut self,
        migration: &Migration,
        query_text: &str,
        direction: MigrationDirection,
    ) -> MigrationResult<()> {
        let mut tx = self.conn.begin().await?;
        record_in(&mut tx, migration, query_text, direction).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn apply_script(
        &mut self,
        migration: &Migration,
        script: &str,
        direction: MigrationDirection,
    ) -> MigrationResult<()> {
        let mut tx = self.conn.begin().await?;

        // no bind parameters, so the whole file goes out as one simple-query batch
        if let Err(e) = (&mut *tx).execute(script).await {
            let cause = e.to_string();
            let err = MigrationError::from(e);
            return Err(if err.is_connection() {
                err
            } else {
                MigrationError::apply_failed(&migration.name, cause)
            });
        }

        record_in(&mut tx, migration, script, direction).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn lock(&mut self) -> MigrationResult<()> {
        sqlx::query("select pg_advisory_lock($1)")
            .bind(APPLY_LOCK_KEY)
            .execute(&mut self.conn)
            .await?;
        tracing::debug!("acquired migration lock");
        Ok(())
    }

    async fn unlock(&mut self) -> MigrationResult<()> {
        sqlx::query("select pg_advisory_unlock($1)")
            .bind(APPLY_LOCK_KEY)
            .execute(&mut self.conn)
            .await?;
        tracing::debug!("released migration lock");
        Ok(())
    }
}
