// ABOUTME: Verify command implementation - check the target matches the source
// ABOUTME: Compares row counts and then row values of the configured tables

use super::table_progress;
use crate::config::Config;
use crate::migration::{Verifier, VerifyReport, VerifySettings};
use crate::postgres::PgStore;
use crate::sqlite::SqliteStore;
use anyhow::{Context, Result};

/// Verify that the target holds the same data as the source
///
/// Tables come from `verify.tables` in the configuration, not from either
/// store. Columns listed in `verify.ignored_columns` are not compared.
/// The first difference found ends the run with an error naming the table,
/// the row and both values.
pub async fn verify(config: &Config) -> Result<VerifyReport> {
    tracing::info!("Starting consistency verification...");

    let source = SqliteStore::open_read_only(&config.source.path)
        .context("Failed to open source database")?;
    let target = PgStore::connect(&config.target)
        .await
        .context("Failed to connect to target database")?;

    let settings = VerifySettings::from(config);
    tracing::info!(
        "Verifying {} tables (ignoring columns: {})",
        settings.tables.len(),
        config.verify.ignored_columns.join(", ")
    );

    let progress = table_progress(settings.tables.len())?;
    let verifier = Verifier::new(settings).with_progress(progress.clone());
    let result = verifier.run(&source, &target).await;
    progress.finish_and_clear();
    let report = result.context("Verification failed")?;

    let rows: i64 = report.tables.iter().map(|t| t.rows).sum();
    tracing::info!("");
    tracing::info!("✓ All {} tables match ({} rows)", report.tables.len(), rows);

    Ok(report)
}
