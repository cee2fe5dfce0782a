// ABOUTME: Capability traits implemented by each storage backend
// ABOUTME: Catalog discovery, paged reads, ordered row cursors and batch upserts

use crate::error::{Backend, Result};
use crate::value::{Page, Record, Value};

/// Read-only catalog access: tables, columns and row counts.
#[allow(async_fn_in_trait)]
pub trait Catalog {
    fn backend(&self) -> Backend;

    /// Table names in enumeration order.
    async fn list_tables(&self) -> Result<Vec<String>>;

    /// Column names of `table`, as described by `SELECT * FROM table`.
    async fn list_columns(&self, table: &str) -> Result<Vec<String>>;

    /// `count(id)` of `table`.
    async fn count_rows(&self, table: &str) -> Result<i64>;
}

/// Forward-only paged reader over whole tables.
#[allow(async_fn_in_trait)]
pub trait PageReader {
    /// Next page of `table`; an empty page means the table is exhausted.
    async fn next_page(&mut self, table: &str, page_size: usize) -> Result<Page>;
}

/// Idempotent multi-row upsert keyed on `id`.
#[allow(async_fn_in_trait)]
pub trait BatchWriter {
    /// Insert `records` into `table`, skipping rows whose `id` already
    /// exists. Returns the number of rows actually inserted. Rows are not
    /// visible to other connections until [`BatchWriter::commit`].
    async fn write_batch(&mut self, table: &str, columns: &[String], records: &[Record])
        -> Result<u64>;

    async fn commit(&mut self) -> Result<()>;
}

/// A finite, forward-only sequence of rows.
#[allow(async_fn_in_trait)]
pub trait RowCursor {
    async fn next_row(&mut self) -> Result<Option<Vec<Value>>>;
}

/// Rows of a table ordered by `id` ascending, restricted to `columns`.
#[allow(async_fn_in_trait)]
pub trait OrderedRows {
    type Cursor<'a>: RowCursor
    where
        Self: 'a;

    async fn rows_by_id<'a>(&'a self, table: &str, columns: &[String])
        -> Result<Self::Cursor<'a>>;
}
