//! Migration Runner - Executes migrations against the database
//!
//! Decides which migrations are pending in a direction, orders them and
//! applies them one at a time. Each migration is its own unit of atomicity:
//! a failure stops the run and leaves earlier migrations of the same run
//! applied.

use chrono::Utc;

use crate::definitions::{ApplyProgress, Migration, MigrationDirection, MigrationRunResult};
use crate::error::{MigrationError, MigrationResult};
use crate::resolver::ScriptResolver;
use crate::store::MigrationStore;

/// Migration engine driving a store and a script resolver
pub struct MigrationEngine<S> {
    store: S,
    resolver: ScriptResolver,
}

impl<S: MigrationStore> MigrationEngine<S> {
    pub fn new(store: S, resolver: ScriptResolver) -> Self {
        Self { store, resolver }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn resolver(&self) -> &ScriptResolver {
        &self.resolver
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Migrations waiting to run in `direction`, in the order they would run.
    ///
    /// `Up` yields pending migrations oldest first; `Down` yields applied
    /// migrations newest first.
    pub async fn list_pending(
        &mut self,
        direction: MigrationDirection,
    ) -> MigrationResult<Vec<Migration>> {
        let mut migrations = self.store.list_by_status(direction.pending_status()).await?;
        if direction == MigrationDirection::Down {
            migrations.reverse();
        }
        Ok(migrations)
    }

    /// Every registered migration, oldest first
    pub async fn status(&mut self) -> MigrationResult<Vec<Migration>> {
        self.store.list_all().await
    }

    /// Scaffold and register a migration named after the current Unix time
    pub async fn create_migration(&mut self) -> MigrationResult<Migration> {
        let name = Utc::now().timestamp().to_string();
        self.create_migration_named(&name).await
    }

    /// Scaffold the script pair, then register it.
    ///
    /// Nothing is registered when scaffolding fails, and the scaffolded
    /// directory is removed when registration fails.
    pub async fn create_migration_named(&mut self, name: &str) -> MigrationResult<Migration> {
        self.resolver.scaffold(name)?;

        match self.store.register_migration(name).await {
            Ok(migration) => {
                tracing::info!(migration = %migration.name, id = %migration.id, "created migration");
                Ok(migration)
            }
            Err(e) => {
                if let Err(cleanup) = self.resolver.remove(name) {
                    tracing::warn!(migration = name, error = %cleanup, "could not remove scaffolded migration");
                }
                Err(e)
            }
        }
    }

    /// Apply every pending migration in `direction`
    pub async fn apply(&mut self, direction: MigrationDirection) -> MigrationResult<MigrationRunResult> {
        self.apply_with_progress(direction, |_| {}).await
    }

    /// Same as [`apply`](Self::apply), reporting each migration as it starts
    /// and once it is recorded.
    pub async fn apply_with_progress<F>(
        &mut self,
        direction: MigrationDirection,
        on_progress: F,
    ) -> MigrationResult<MigrationRunResult>
    where
        F: FnMut(ApplyProgress<'_>),
    {
        self.store.lock().await?;
        let result = self.run_locked(direction, on_progress).await;
        let unlocked = self.store.unlock().await;

        match (result, unlocked) {
            (Ok(run), Ok(())) => Ok(run),
            (Err(e), Ok(())) => Err(e),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Err(unlock_err)) => {
                tracing::warn!(error = %unlock_err, "could not release migration lock");
                Err(e)
            }
        }
    }

    async fn run_locked<F>(
        &mut self,
        direction: MigrationDirection,
        mut on_progress: F,
    ) -> MigrationResult<MigrationRunResult>
    where
        F: FnMut(ApplyProgress<'_>),
    {
        let start_time = std::time::Instant::now();
        let pending = self.list_pending(direction).await?;

        if pending.is_empty() {
            tracing::info!(%direction, "no pending migrations");
        }

        let mut applied_migrations = Vec::with_capacity(pending.len());
        for migration in &pending {
            let script = self.resolver.load(&migration.name, direction)?;

            on_progress(ApplyProgress::Started(migration, direction));
            tracing::info!(migration = %migration.name, %direction, "applying migration");

            self.store.apply_script(migration, &script, direction).await?;

            on_progress(ApplyProgress::Applied(migration, direction));
            applied_migrations.push(migration.name.clone());
        }

        Ok(MigrationRunResult {
            direction,
            applied_migrations,
            execution_time_ms: start_time.elapsed().as_millis(),
        })
    }

    /// Find a registered migration by name
    pub async fn find(&mut self, name: &str) -> MigrationResult<Migration> {
        self.store
            .list_all()
            .await?
            .into_iter()
            .find(|m| m.name == name)
            .ok_or_else(|| MigrationError::NotRegistered {
                name: name.to_string(),
            })
    }
}
