// ABOUTME: Transfer command implementation - copy every SQLite table into PostgreSQL
// ABOUTME: Opens both stores, runs the paged transfer and logs a per-run summary

use super::table_progress;
use crate::config::Config;
use crate::connector::Catalog;
use crate::migration::{Transfer, TransferReport, TransferSettings};
use crate::postgres::PgStore;
use crate::sqlite::SqliteStore;
use anyhow::{Context, Result};

/// Copy all rows of the SQLite source into the PostgreSQL target
///
/// Steps:
/// 1. Opens the source database read-only
/// 2. Connects to the target with `search_path` pinned
/// 3. Checks that every source table and column exists in the target
/// 4. Moves each table page by page, committing after every page
///
/// Rows whose `id` already exists in the target are skipped, so running the
/// command twice leaves the target unchanged.
///
/// # Examples
///
/// ```no_run
/// # use anyhow::Result;
/// # use sqlite_pg_transfer::{commands::transfer, config::Config};
/// # async fn example() -> Result<()> {
/// let report = transfer(&Config::default()).await?;
/// println!("{} rows inserted", report.rows_inserted());
/// # Ok(())
/// # }
/// ```
pub async fn transfer(config: &Config) -> Result<TransferReport> {
    tracing::info!("Starting transfer...");

    tracing::info!("Opening source database {}...", config.source.path.display());
    let source = SqliteStore::open_read_only(&config.source.path)
        .context("Failed to open source database")?;

    tracing::info!("Connecting to target database...");
    let mut target = PgStore::connect(&config.target)
        .await
        .context("Failed to connect to target database")?;

    let tables = source
        .list_tables()
        .await
        .context("Failed to list tables from source database")?;
    if tables.is_empty() {
        tracing::warn!("⚠ No tables found in source database");
    }
    tracing::info!(
        "Found {} tables, page size {}",
        tables.len(),
        config.page_size
    );

    let progress = table_progress(tables.len())?;
    let engine = Transfer::new(TransferSettings::from(config)).with_progress(progress.clone());
    let result = engine.run(&source, &mut source.loader(), &mut target).await;
    progress.finish_and_clear();
    let report = result.context("Transfer did not complete")?;

    tracing::info!("");
    tracing::info!("========================================");
    tracing::info!("Transfer Summary");
    tracing::info!("========================================");
    tracing::info!("Tables:        {}", report.tables.len());
    tracing::info!("Rows read:     {}", report.rows_read());
    tracing::info!("Rows inserted: {}", report.rows_inserted());
    tracing::info!(
        "Rows skipped:  {}",
        report.rows_read() - report.rows_inserted()
    );
    tracing::info!("========================================");

    Ok(report)
}
