pub mod apply;
pub mod create_migration;
pub mod init;
pub mod status;

use std::path::Path;

use anyhow::Context;
use dbmigo_core::Config;
use dbmigo_migrations::{MigrationEngine, PgMigrationStore};

/// Load the config file and open an engine on the database it names
pub(crate) async fn open_engine(
    config_file: &Path,
) -> anyhow::Result<MigrationEngine<PgMigrationStore>> {
    let config = Config::load(config_file)
        .with_context(|| format!("Could not load config file {}", config_file.display()))?;
    tracing::debug!(migrations_dir = %config.migrations_dir, "loaded config");

    let engine = dbmigo_migrations::connect(&config)
        .await
        .context("Could not connect to the database")?;
    Ok(engine)
}
