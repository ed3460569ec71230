mod commands;
mod logging;
mod utils;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use commands::*;
use console::style;
use dbmigo_core::{DEFAULT_CONFIG_FILE, DEFAULT_MIGRATIONS_DIR};
use dbmigo_migrations::MigrationDirection;

#[derive(Parser)]
#[command(name = "dbmigo")]
#[command(about = "Migration Management Tool for PostgreSQL", version)]
struct Cli {
    /// Show debug logs (RUST_LOG takes precedence)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize dbmigo in a project directory
    ///
    /// Creates the migrations directory and a config file holding the
    /// database connection string and the migrations directory path, then
    /// provisions the tracking tables in the database.
    Init {
        /// Directory to store migration files
        #[arg(long, short = 'd', default_value = DEFAULT_MIGRATIONS_DIR)]
        migrations_dir: PathBuf,

        /// Database connection string (prompted for when omitted)
        #[arg(long, short = 'c')]
        db_connection: Option<String>,

        /// Use SSL for the database connection
        #[arg(long, short)]
        ssl: bool,

        /// Path of the config file to write
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        config_file: PathBuf,
    },

    /// Create a new migration in the configured migrations directory
    ///
    /// The migration gets an up.sql and a down.sql with placeholders for the
    /// migration queries.
    #[command(alias = "scaffold")]
    CreateMigration {
        /// Config file to use
        #[arg(long, short, default_value = DEFAULT_CONFIG_FILE)]
        config_file: PathBuf,
    },

    /// Apply pending migrations from the configured migrations directory
    ///
    /// UP applies migrations in the order of their creation; DOWN reverts
    /// applied migrations, most recent first.
    ApplyMigrations {
        /// Config file to use
        #[arg(long, short, default_value = DEFAULT_CONFIG_FILE)]
        config_file: PathBuf,

        /// Type of migration to apply (UP or DOWN)
        #[arg(long = "type", short = 't', default_value = "UP")]
        migration_type: MigrationDirection,
    },

    /// Show every registered migration and its status
    Status {
        /// Config file to use
        #[arg(long, short, default_value = DEFAULT_CONFIG_FILE)]
        config_file: PathBuf,
    },
}

async fn run(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Init {
            migrations_dir,
            db_connection,
            ssl,
            config_file,
        } => {
            let args = init::InitArgs {
                migrations_dir,
                db_connection,
                ssl,
                config_file,
            };
            init::run(args).await?;
        }
        Commands::CreateMigration { config_file } => {
            create_migration::run(&config_file).await?;
        }
        Commands::ApplyMigrations {
            config_file,
            migration_type,
        } => {
            apply::run(&config_file, migration_type).await?;
        }
        Commands::Status { config_file } => {
            status::run(&config_file).await?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init_logging(logging::LoggingConfig::for_cli(cli.verbose)) {
        eprintln!("{}", style(format!("Could not initialize logging: {}", e)).yellow());
    }

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", style(format!("{:#}", e)).red());
            ExitCode::FAILURE
        }
    }
}
