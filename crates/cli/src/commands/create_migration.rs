use std::path::Path;

use console::style;

use super::open_engine;

pub async fn run(config_file: &Path) -> anyhow::Result<()> {
    let mut engine = open_engine(config_file).await?;

    let created = engine.create_migration().await;
    let closed = engine.into_store().close().await;
    let migration = created?;
    closed?;

    println!(
        "{}",
        style(format!("Migration {} created successfully", migration.name)).green()
    );
    Ok(())
}
