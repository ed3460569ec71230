#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use uuid::Uuid;

use dbmigo_migrations::{
    Migration, MigrationDirection, MigrationEngine, MigrationError, MigrationQuery,
    MigrationResult, MigrationStatus, MigrationStore, ScriptResolver,
};

/// Store kept in memory; scripts containing `fail_marker` fail to execute
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub migrations: Vec<Migration>,
    pub queries: Vec<MigrationQuery>,
    /// Every script handed to `apply_script`, in order
    pub executed: Vec<String>,
    pub fail_marker: Option<String>,
    pub provisioned: bool,
    pub locked: bool,
    pub lock_count: usize,
}

impl MemoryStore {
    pub fn failing_on(marker: &str) -> Self {
        Self {
            fail_marker: Some(marker.to_string()),
            ..Self::default()
        }
    }

    pub fn status_of(&self, name: &str) -> Option<MigrationStatus> {
        self.migrations.iter().find(|m| m.name == name).map(|m| m.status)
    }

    fn sorted(&self, status: Option<MigrationStatus>) -> Vec<Migration> {
        let mut migrations: Vec<Migration> = self
            .migrations
            .iter()
            .filter(|m| status.map_or(true, |s| m.status == s))
            .cloned()
            .collect();
        migrations.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.name.cmp(&b.name)));
        migrations
    }
}

#[async_trait]
impl MigrationStore for MemoryStore {
    async fn provision(&mut self) -> MigrationResult<()> {
        self.provisioned = true;
        Ok(())
    }

    async fn register_migration(&mut self, name: &str) -> MigrationResult<Migration> {
        if self.migrations.iter().any(|m| m.name == name) {
            return Err(MigrationError::duplicate_name(name));
        }
        // creation time follows the timestamp name so ordering is deterministic
        let created_at = name
            .parse::<i64>()
            .ok()
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .unwrap_or_else(|| Utc::now() + Duration::seconds(self.migrations.len() as i64));

        let migration = Migration {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at,
            status: MigrationStatus::Pending,
        };
        self.migrations.push(migration.clone());
        Ok(migration)
    }

    async fn list_by_status(&mut self, status: MigrationStatus) -> MigrationResult<Vec<Migration>> {
        Ok(self.sorted(Some(status)))
    }

    async fn list_all(&mut self) -> MigrationResult<Vec<Migration>> {
        Ok(self.sorted(None))
    }

    async fn list_queries(&mut self, migration_id: Uuid) -> MigrationResult<Vec<MigrationQuery>> {
        Ok(self
            .queries
            .iter()
            .filter(|q| q.migration_id == migration_id)
            .cloned()
            .collect())
    }

    async fn record_application(
        &mut self,
        migration: &Migration,
        query_text: &str,
        direction: MigrationDirection,
    ) -> MigrationResult<()> {
        let record = self
            .migrations
            .iter_mut()
            .find(|m| m.id == migration.id)
            .ok_or_else(|| {
                MigrationError::ConstraintViolation(format!("unknown migration {}", migration.id))
            })?;

        record.status = direction.resulting_status();
        self.queries.push(MigrationQuery {
            id: Uuid::new_v4(),
            migration_id: migration.id,
            query_text: query_text.to_string(),
            direction,
            executed_at: Utc::now(),
        });
        Ok(())
    }

    async fn apply_script(
        &mut self,
        migration: &Migration,
        script: &str,
        direction: MigrationDirection,
    ) -> MigrationResult<()> {
        self.executed.push(script.to_string());
        if let Some(marker) = &self.fail_marker {
            if script.contains(marker.as_str()) {
                return Err(MigrationError::apply_failed(
                    &migration.name,
                    format!("syntax error at or near \"{}\"", marker),
                ));
            }
        }
        self.record_application(migration, script, direction).await
    }

    async fn lock(&mut self) -> MigrationResult<()> {
        assert!(!self.locked, "apply run started while another held the lock");
        self.locked = true;
        self.lock_count += 1;
        Ok(())
    }

    async fn unlock(&mut self) -> MigrationResult<()> {
        self.locked = false;
        Ok(())
    }
}

pub fn engine(store: MemoryStore, migrations_dir: &std::path::Path) -> MigrationEngine<MemoryStore> {
    MigrationEngine::new(store, ScriptResolver::new(migrations_dir))
}

/// Scaffold and register `names`, writing `up`/`down` SQL for each
pub async fn seed(
    engine: &mut MigrationEngine<MemoryStore>,
    migrations: &[(&str, &str, &str)],
) -> Vec<Migration> {
    let mut created = Vec::new();
    for (name, up, down) in migrations {
        let migration = engine.create_migration_named(name).await.unwrap();
        let resolver = engine.resolver();
        std::fs::write(resolver.script_path(name, MigrationDirection::Up), up).unwrap();
        std::fs::write(resolver.script_path(name, MigrationDirection::Down), down).unwrap();
        created.push(migration);
    }
    created
}
