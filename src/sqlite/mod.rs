// ABOUTME: SQLite store: opening database files and catalog introspection
// ABOUTME: Source side of a transfer; also usable as a target through BatchWriter

pub mod reader;
pub mod writer;

pub use reader::{SqliteLoader, SqliteRows};

use crate::connector::Catalog;
use crate::error::{Backend, Result, StoreContext, TransferError};
use crate::utils::{quote_ident, validate_identifier};
use crate::value::Value;
use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{Connection, OpenFlags, ToSql};
use std::path::Path;

/// An open SQLite database.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open an existing database file without write access
    ///
    /// A missing file is an error; SQLite would otherwise create an empty
    /// database and the transfer would silently copy nothing.
    pub fn open_read_only(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(TransferError::connectivity(
                Backend::Sqlite,
                format!("opening '{}'", path.display()),
                std::io::Error::new(std::io::ErrorKind::NotFound, "database file does not exist"),
            ));
        }

        tracing::debug!("Opening SQLite database '{}' read-only", path.display());
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .store_context(Backend::Sqlite, || format!("opening '{}'", path.display()))?;

        Ok(Self { conn })
    }

    /// Open (or create) a database file for reading and writing.
    pub fn open(path: &Path) -> Result<Self> {
        tracing::debug!("Opening SQLite database '{}'", path.display());
        let conn = Connection::open(path)
            .store_context(Backend::Sqlite, || format!("opening '{}'", path.display()))?;
        Ok(Self { conn })
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// A fresh paged reader positioned before the first row of every table.
    pub fn loader(&self) -> SqliteLoader<'_> {
        SqliteLoader::new(&self.conn)
    }
}

/// Column names of `table`, in declaration order.
pub(crate) fn describe_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    validate_identifier(table)?;
    let stmt = conn
        .prepare(&format!("SELECT * FROM {}", quote_ident(table)))
        .store_context(Backend::Sqlite, || format!("describing table '{}'", table))?;

    Ok(stmt.column_names().into_iter().map(str::to_string).collect())
}

impl Catalog for SqliteStore {
    fn backend(&self) -> Backend {
        Backend::Sqlite
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        let action = || "listing tables".to_string();
        let mut stmt = self
            .conn
            .prepare(
                "SELECT name FROM sqlite_master
                 WHERE type = 'table' AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\'
                 ORDER BY rowid",
            )
            .store_context(Backend::Sqlite, action)?;

        let tables = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .store_context(Backend::Sqlite, action)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .store_context(Backend::Sqlite, action)?;

        tracing::debug!("Found {} tables in SQLite catalog", tables.len());
        Ok(tables)
    }

    async fn list_columns(&self, table: &str) -> Result<Vec<String>> {
        describe_columns(&self.conn, table)
    }

    async fn count_rows(&self, table: &str) -> Result<i64> {
        validate_identifier(table)?;
        self.conn
            .query_row(
                &format!("SELECT count(id) FROM {}", quote_ident(table)),
                [],
                |row| row.get(0),
            )
            .store_context(Backend::Sqlite, || format!("counting rows of '{}'", table))
    }
}

impl From<ValueRef<'_>> for Value {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(f) => Value::Real(f),
            ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Borrowed(ValueRef::Null),
            Value::Integer(i) => ToSqlOutput::Borrowed(ValueRef::Integer(*i)),
            Value::Real(f) => ToSqlOutput::Borrowed(ValueRef::Real(*f)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
        })
    }
}
