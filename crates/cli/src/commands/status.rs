use std::path::Path;

use console::style;
use dbmigo_migrations::MigrationStatus;

use super::open_engine;

pub async fn run(config_file: &Path) -> anyhow::Result<()> {
    let mut engine = open_engine(config_file).await?;

    let listed = engine.status().await;
    let closed = engine.into_store().close().await;
    let migrations = listed?;
    closed?;

    if migrations.is_empty() {
        println!("No migrations found");
        return Ok(());
    }

    println!("{:<14} {:<8} {}", "Migration", "Status", "Created");
    for migration in &migrations {
        let status = match migration.status {
            MigrationStatus::Applied => style(migration.status.as_str()).green(),
            MigrationStatus::Pending => style(migration.status.as_str()).yellow(),
        };
        println!(
            "{:<14} {:<8} {}",
            migration.name,
            status,
            migration.created_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }

    let pending = migrations.iter().filter(|m| !m.is_applied()).count();
    println!();
    println!("{} total, {} pending", migrations.len(), pending);
    Ok(())
}
