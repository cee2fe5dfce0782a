// ABOUTME: Paged table reads and id-ordered row cursors over SQLite
// ABOUTME: Cursor state lives in the reader instance and is never persisted

use super::{describe_columns, SqliteStore};
use crate::connector::{OrderedRows, PageReader, RowCursor};
use crate::error::{Backend, Result, SchemaMismatch, StoreContext, TransferError};
use crate::utils::{quote_ident, validate_identifier};
use crate::value::{Page, Record, Value};
use rusqlite::{params, Connection};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// Rows fetched per round trip by [`SqliteRows`].
const ROW_CHUNK: i64 = 500;

struct TableCursor {
    columns: Arc<[String]>,
    last_rowid: Option<i64>,
    exhausted: bool,
}

/// Paged reader over SQLite tables
///
/// Each table gets its own forward cursor, keyed on `rowid`, created on the
/// first [`PageReader::next_page`] call for that table. The column list is
/// captured at that moment and every later page of the table must have the
/// same shape. Tables declared `WITHOUT ROWID` are not supported.
pub struct SqliteLoader<'c> {
    conn: &'c Connection,
    cursors: HashMap<String, TableCursor>,
}

impl<'c> SqliteLoader<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self {
            conn,
            cursors: HashMap::new(),
        }
    }
}

impl PageReader for SqliteLoader<'_> {
    async fn next_page(&mut self, table: &str, page_size: usize) -> Result<Page> {
        if page_size == 0 {
            return Err(TransferError::Config(
                "page size must be greater than zero".to_string(),
            ));
        }

        let conn = self.conn;
        let cursor = match self.cursors.entry(table.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let columns = describe_columns(conn, table)?;
                tracing::debug!("Record shape for '{}': {:?}", table, columns);
                entry.insert(TableCursor {
                    columns: columns.into(),
                    last_rowid: None,
                    exhausted: false,
                })
            }
        };

        if cursor.exhausted {
            return Ok(Page::empty(cursor.columns.clone()));
        }

        let action = || format!("reading a page of '{}'", table);
        let mut stmt = conn
            .prepare_cached(&format!(
                "SELECT _rowid_, * FROM {} WHERE _rowid_ > ?1 ORDER BY _rowid_ LIMIT ?2",
                quote_ident(table)
            ))
            .store_context(Backend::Sqlite, action)?;

        let width = cursor.columns.len();
        if stmt.column_count() != width + 1 {
            return Err(SchemaMismatch::ShapeChanged {
                table: table.to_string(),
            }
            .into());
        }

        let after = cursor.last_rowid.unwrap_or(i64::MIN);
        let mut rows = stmt
            .query(params![after, page_size as i64])
            .store_context(Backend::Sqlite, action)?;

        let mut records = Vec::with_capacity(page_size);
        while let Some(row) = rows.next().store_context(Backend::Sqlite, action)? {
            let rowid: i64 = row.get(0).store_context(Backend::Sqlite, action)?;
            let mut values = Vec::with_capacity(width);
            for idx in 1..=width {
                values.push(Value::from(
                    row.get_ref(idx).store_context(Backend::Sqlite, action)?,
                ));
            }
            cursor.last_rowid = Some(rowid);
            records.push(Record::new(values));
        }

        if records.len() < page_size {
            cursor.exhausted = true;
        }

        Ok(Page {
            columns: cursor.columns.clone(),
            records,
        })
    }
}

/// Forward-only cursor over `SELECT columns FROM table ORDER BY id`
///
/// Rows are fetched in chunks keyed on the last `id` seen, which is selected
/// alongside the requested columns and stripped before rows are returned.
pub struct SqliteRows<'c> {
    conn: &'c Connection,
    table: String,
    first_sql: String,
    next_sql: String,
    last_id: Option<Value>,
    buffer: VecDeque<Vec<Value>>,
    done: bool,
}

impl SqliteRows<'_> {
    fn fill(&mut self) -> Result<()> {
        let conn = self.conn;
        let table = self.table.as_str();
        let action = || format!("streaming rows of '{}'", table);

        let (mut stmt, after) = match &self.last_id {
            Some(last) => (
                conn.prepare_cached(&self.next_sql)
                    .store_context(Backend::Sqlite, action)?,
                Some(last),
            ),
            None => (
                conn.prepare_cached(&self.first_sql)
                    .store_context(Backend::Sqlite, action)?,
                None,
            ),
        };
        let width = stmt.column_count();
        let mut rows = match after {
            Some(last) => stmt.query(params![last, ROW_CHUNK]),
            None => stmt.query(params![ROW_CHUNK]),
        }
        .store_context(Backend::Sqlite, action)?;

        let mut fetched = 0;
        let mut last_id = None;
        while let Some(row) = rows.next().store_context(Backend::Sqlite, action)? {
            last_id = Some(Value::from(
                row.get_ref(0).store_context(Backend::Sqlite, action)?,
            ));
            let mut values = Vec::with_capacity(width - 1);
            for idx in 1..width {
                values.push(Value::from(
                    row.get_ref(idx).store_context(Backend::Sqlite, action)?,
                ));
            }
            self.buffer.push_back(values);
            fetched += 1;
        }
        drop(rows);
        drop(stmt);

        if last_id.is_some() {
            self.last_id = last_id;
        }
        if fetched < ROW_CHUNK {
            self.done = true;
        }
        Ok(())
    }
}

impl RowCursor for SqliteRows<'_> {
    async fn next_row(&mut self) -> Result<Option<Vec<Value>>> {
        if self.buffer.is_empty() && !self.done {
            self.fill()?;
        }
        Ok(self.buffer.pop_front())
    }
}

impl OrderedRows for SqliteStore {
    type Cursor<'a> = SqliteRows<'a>
    where
        Self: 'a;

    async fn rows_by_id<'a>(&'a self, table: &str, columns: &[String]) -> Result<SqliteRows<'a>> {
        validate_identifier(table)?;
        for column in columns {
            validate_identifier(column)?;
        }

        let select_list = std::iter::once("id")
            .chain(columns.iter().map(String::as_str))
            .map(quote_ident)
            .collect::<Vec<_>>()
            .join(", ");
        let from = format!("SELECT {} FROM {}", select_list, quote_ident(table));

        Ok(SqliteRows {
            conn: self.connection(),
            table: table.to_string(),
            first_sql: format!("{} ORDER BY id LIMIT ?1", from),
            next_sql: format!("{} WHERE id > ?1 ORDER BY id LIMIT ?2", from),
            last_id: None,
            buffer: VecDeque::new(),
            done: columns.is_empty(),
        })
    }
}
