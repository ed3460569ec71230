use std::path::Path;

use console::style;
use dbmigo_migrations::{ApplyProgress, MigrationDirection};

use super::open_engine;

pub async fn run(config_file: &Path, direction: MigrationDirection) -> anyhow::Result<()> {
    let mut engine = open_engine(config_file).await?;

    let outcome = engine
        .apply_with_progress(direction, |progress| match progress {
            ApplyProgress::Started(migration, _) => {
                println!("{}", style(format!("Applying migration {}", migration.name)).yellow());
            }
            ApplyProgress::Applied(migration, _) => {
                println!(
                    "{}",
                    style(format!("Migration {} applied successfully", migration.name)).green()
                );
            }
        })
        .await;
    let closed = engine.into_store().close().await;
    let run = match outcome {
        Ok(run) => run,
        Err(e) => {
            if let Some(name) = e.migration_name() {
                eprintln!("{}", style(failure_hint(direction, name)).yellow());
            }
            return Err(e.into());
        }
    };
    closed?;

    if run.applied_count() == 0 {
        println!("No migrations to apply");
    } else {
        println!(
            "{}",
            style(format!(
                "Applied {} {} migration(s) in {}ms",
                run.applied_count(),
                run.direction,
                run.execution_time_ms
            ))
            .green()
        );
    }
    Ok(())
}

/// What a failed run left behind, worded for the direction it ran in
fn failure_hint(direction: MigrationDirection, name: &str) -> String {
    match direction {
        MigrationDirection::Up => format!(
            "Migrations applied before {} stay applied; fix it and run apply-migrations again",
            name
        ),
        MigrationDirection::Down => format!(
            "Migrations reverted before {} stay reverted; fix it and run apply-migrations --type DOWN again",
            name
        ),
    }
}
