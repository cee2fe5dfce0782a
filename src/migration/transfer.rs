// ABOUTME: Transfer orchestrator: schema gate, then the per-table paged load, write, commit loop
// ABOUTME: Each page is committed on its own; earlier tables are never rolled back

use super::schema::{check_columns, check_tables, ColumnRenames, SchemaInspector};
use crate::config::Config;
use crate::connector::{BatchWriter, Catalog, PageReader};
use crate::error::{Result, SchemaMismatch};
use crate::utils::sanitize_identifier;
use indicatif::ProgressBar;

/// Settings the orchestrator runs with.
#[derive(Debug, Clone)]
pub struct TransferSettings {
    pub page_size: usize,
    pub renames: ColumnRenames,
}

impl From<&Config> for TransferSettings {
    fn from(config: &Config) -> Self {
        Self {
            page_size: config.page_size,
            renames: config.columns.rename.clone(),
        }
    }
}

/// Per-table outcome of a transfer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableTransfer {
    pub table: String,
    pub pages: u64,
    pub rows_read: u64,
    pub rows_inserted: u64,
}

impl TableTransfer {
    /// Rows skipped because their id was already present in the target.
    pub fn rows_skipped(&self) -> u64 {
        self.rows_read - self.rows_inserted
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferReport {
    pub tables: Vec<TableTransfer>,
}

impl TransferReport {
    pub fn rows_read(&self) -> u64 {
        self.tables.iter().map(|t| t.rows_read).sum()
    }

    pub fn rows_inserted(&self) -> u64 {
        self.tables.iter().map(|t| t.rows_inserted).sum()
    }
}

/// Drives a full transfer from a source store into a target store.
pub struct Transfer {
    settings: TransferSettings,
    progress: ProgressBar,
}

impl Transfer {
    pub fn new(settings: TransferSettings) -> Self {
        Self {
            settings,
            progress: ProgressBar::hidden(),
        }
    }

    /// Report per-table progress on `progress`.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Transfer every source table
    ///
    /// Fails before writing anything if the target lacks a source table.
    /// Column mismatches are detected per table inside the loop, so tables
    /// already transferred stay committed when a later table fails.
    pub async fn run<S, L, T>(&self, source: &S, loader: &mut L, target: &mut T) -> Result<TransferReport>
    where
        S: Catalog,
        L: PageReader,
        T: Catalog + BatchWriter,
    {
        let result = self.run_tables(source, loader, target).await;
        if let Err(e) = &result {
            tracing::error!("Transfer failed: {}", e);
        }
        result
    }

    async fn run_tables<S, L, T>(&self, source: &S, loader: &mut L, target: &mut T) -> Result<TransferReport>
    where
        S: Catalog,
        L: PageReader,
        T: Catalog + BatchWriter,
    {
        let inspector = SchemaInspector::new(&self.settings.renames);

        let source_tables = inspector.list_source_tables(source).await?;
        let target_tables = inspector.list_target_tables(&*target).await?;
        tracing::debug!(
            "{} source has {} tables, {} target has {}",
            source.backend(),
            source_tables.len(),
            target.backend(),
            target_tables.len()
        );
        check_tables(&source_tables, &target_tables)?;

        self.progress.set_length(source_tables.len() as u64);

        let mut report = TransferReport::default();
        for table in &source_tables {
            self.progress
                .set_message(format!("Transferring {}", sanitize_identifier(table)));
            let stats = self.transfer_table(&inspector, source, loader, target, table).await?;

            tracing::info!(
                "  ✓ {}: {} rows read, {} inserted, {} already present",
                sanitize_identifier(table),
                stats.rows_read,
                stats.rows_inserted,
                stats.rows_skipped()
            );
            report.tables.push(stats);
            self.progress.inc(1);
        }

        Ok(report)
    }

    async fn transfer_table<S, L, T>(
        &self,
        inspector: &SchemaInspector<'_>,
        source: &S,
        loader: &mut L,
        target: &mut T,
        table: &str,
    ) -> Result<TableTransfer>
    where
        S: Catalog,
        L: PageReader,
        T: Catalog + BatchWriter,
    {
        tracing::debug!("Start transferring table '{}'", sanitize_identifier(table));

        let columns = inspector.list_source_columns(source, table).await?;
        let target_columns = inspector.list_target_columns(&*target, table).await?;
        check_columns(table, &columns, &target_columns)?;

        let mut stats = TableTransfer {
            table: table.to_string(),
            ..TableTransfer::default()
        };

        loop {
            let page = loader.next_page(table, self.settings.page_size).await?;
            if page.is_empty() {
                break;
            }

            let page_columns: Vec<String> =
                page.columns.iter().map(|c| inspector.rename(c)).collect();
            if page_columns != columns {
                return Err(SchemaMismatch::ShapeChanged {
                    table: table.to_string(),
                }
                .into());
            }

            let inserted = target.write_batch(table, &columns, &page.records).await?;
            target.commit().await?;

            stats.pages += 1;
            stats.rows_read += page.len() as u64;
            stats.rows_inserted += inserted;
        }

        tracing::debug!(
            "Finish transferring table '{}' ({} pages)",
            sanitize_identifier(table),
            stats.pages
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::SqliteStore;
    use rusqlite::Connection;

    fn store(sql: &str) -> SqliteStore {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(sql).unwrap();
        SqliteStore::from_connection(conn)
    }

    fn settings(page_size: usize) -> TransferSettings {
        TransferSettings {
            page_size,
            renames: ColumnRenames::from_pairs([("updated_at", "modified")]),
        }
    }

    #[tokio::test]
    async fn test_report_counts_pages_and_rows() {
        let source = store(
            "CREATE TABLE genre (id TEXT PRIMARY KEY, name TEXT, updated_at TEXT);
             INSERT INTO genre VALUES ('g1', 'Drama', 'x'), ('g2', 'Comedy', 'y'), ('g3', 'Horror', 'z');",
        );
        let mut target = store("CREATE TABLE genre (id TEXT PRIMARY KEY, name TEXT, modified TEXT);");

        let transfer = Transfer::new(settings(2));
        let report = transfer
            .run(&source, &mut source.loader(), &mut target)
            .await
            .unwrap();

        assert_eq!(
            report.tables,
            vec![TableTransfer {
                table: "genre".to_string(),
                pages: 2,
                rows_read: 3,
                rows_inserted: 3,
            }]
        );

        let modified: String = target
            .connection()
            .query_row("SELECT modified FROM genre WHERE id = 'g2'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(modified, "y");
    }

    #[tokio::test]
    async fn test_empty_source_table_transfers_nothing() {
        let source = store("CREATE TABLE genre (id TEXT PRIMARY KEY, name TEXT);");
        let mut target = store("CREATE TABLE genre (id TEXT PRIMARY KEY, name TEXT);");

        let report = Transfer::new(settings(200))
            .run(&source, &mut source.loader(), &mut target)
            .await
            .unwrap();
        assert_eq!(report.tables[0].pages, 0);
        assert_eq!(report.rows_read(), 0);
    }
}
