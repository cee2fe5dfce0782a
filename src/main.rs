// ABOUTME: CLI entry point for sqlite-pg-transfer
// ABOUTME: Layers configuration, then routes to the transfer or verify command

use clap::{Parser, Subcommand};
use sqlite_pg_transfer::commands;
use sqlite_pg_transfer::config::Config;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sqlite-pg-transfer")]
#[command(about = "Copy a SQLite database into PostgreSQL and verify the result", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Path to a TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Path to the source SQLite database (overrides config and SQLITE_PATH)
    #[arg(long, global = true)]
    sqlite: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy every source table into the target, skipping rows already present
    Transfer {
        /// Rows per page; each page is committed on its own
        #[arg(long)]
        page_size: Option<usize>,
    },
    /// Check the configured tables hold the same rows in source and target
    Verify,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging - default to INFO level if RUST_LOG not set
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // A missing .env file is not an error
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            tracing::warn!("Failed to load .env file: {}", e);
        }
    }

    let cli = Cli::parse();

    let result = run(cli).await;
    if let Err(e) = &result {
        tracing::error!("{:#}", e);
    }
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    config.apply_env(|key| std::env::var(key).ok())?;
    if let Some(path) = cli.sqlite {
        config.source.path = path;
    }

    match cli.command {
        Commands::Transfer { page_size } => {
            if let Some(page_size) = page_size {
                config.page_size = page_size;
            }
            config.validate()?;
            commands::transfer(&config).await?;
        }
        Commands::Verify => {
            config.validate()?;
            commands::verify(&config).await?;
        }
    }
    Ok(())
}
