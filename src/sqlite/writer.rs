// ABOUTME: Batch upsert into SQLite tables
// ABOUTME: Lets an SQLite file act as a transfer target with the same conflict-skip semantics

use super::SqliteStore;
use crate::connector::BatchWriter;
use crate::error::{Backend, Result, SchemaMismatch, StoreContext};
use crate::utils::{upsert_sql, validate_identifier};
use crate::value::Record;

/// Bind parameter limit of the bundled SQLite build.
const MAX_BIND_PARAMS: usize = 32_766;

impl BatchWriter for SqliteStore {
    async fn write_batch(
        &mut self,
        table: &str,
        columns: &[String],
        records: &[Record],
    ) -> Result<u64> {
        if records.is_empty() || columns.is_empty() {
            return Ok(0);
        }

        validate_identifier(table)?;
        for column in columns {
            validate_identifier(column)?;
        }
        if records.iter().any(|r| r.values.len() != columns.len()) {
            return Err(SchemaMismatch::ShapeChanged {
                table: table.to_string(),
            }
            .into());
        }

        let conn = self.connection();
        let action = || format!("writing a batch into '{}'", table);
        if conn.is_autocommit() {
            conn.execute_batch("BEGIN").store_context(Backend::Sqlite, action)?;
        }

        let rows_per_statement = (MAX_BIND_PARAMS / columns.len()).max(1);
        let mut inserted = 0u64;
        for chunk in records.chunks(rows_per_statement) {
            let sql = upsert_sql(table, columns, chunk.len(), |n, _| format!("?{}", n));
            let params = rusqlite::params_from_iter(chunk.iter().flat_map(|r| r.values.iter()));
            inserted += conn
                .execute(&sql, params)
                .store_context(Backend::Sqlite, action)? as u64;
        }

        Ok(inserted)
    }

    async fn commit(&mut self) -> Result<()> {
        let conn = self.connection();
        if !conn.is_autocommit() {
            conn.execute_batch("COMMIT")
                .store_context(Backend::Sqlite, || "committing".to_string())?;
        }
        Ok(())
    }
}
