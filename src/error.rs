// ABOUTME: Error taxonomy for transfer and verification runs
// ABOUTME: Separates schema gate failures, store connectivity failures and data mismatches

use std::fmt;
use thiserror::Error;

/// Boxed driver error carried inside [`TransferError::Connectivity`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for transfer and verification operations.
pub type Result<T, E = TransferError> = std::result::Result<T, E>;

/// The storage engine an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Sqlite,
    Postgres,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Sqlite => f.write_str("sqlite"),
            Backend::Postgres => f.write_str("postgres"),
        }
    }
}

/// Top-level error for a transfer or verification run.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The target schema does not cover the source schema.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(#[from] SchemaMismatch),

    /// A store could not be reached, or a query against it failed.
    #[error("{backend} error while {action}: {source}")]
    Connectivity {
        backend: Backend,
        action: String,
        #[source]
        source: BoxError,
    },

    /// Source and target disagree after a transfer.
    #[error("consistency check failed: {0}")]
    Consistency(#[from] ConsistencyError),

    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Tables or columns present in the source but absent from the target.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaMismatch {
    #[error("target is missing tables {0:?}")]
    MissingTables(Vec<String>),

    #[error("target table '{table}' is missing columns {columns:?}")]
    MissingColumns { table: String, columns: Vec<String> },

    #[error("columns of source table '{table}' changed during the transfer")]
    ShapeChanged { table: String },
}

/// Data-level disagreement between source and target.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConsistencyError {
    #[error("table '{table}' has different sizes: source={source_rows}, target={target_rows}")]
    SizeMismatch {
        table: String,
        source_rows: i64,
        target_rows: i64,
    },

    #[error(
        "table '{table}' row {row} (id={id}) differs in column '{column}': source={source_value}, target={target_value}"
    )]
    ValueMismatch {
        table: String,
        row: u64,
        id: String,
        column: String,
        source_value: String,
        target_value: String,
    },

    #[error("table '{table}' ran out of {side} rows after {row} rows")]
    UnexpectedEnd {
        table: String,
        side: &'static str,
        row: u64,
    },
}

impl TransferError {
    pub fn connectivity(
        backend: Backend,
        action: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        TransferError::Connectivity {
            backend,
            action: action.into(),
            source: source.into(),
        }
    }
}

/// Attach backend and action context to a driver error.
pub trait StoreContext<T> {
    fn store_context(self, backend: Backend, action: impl FnOnce() -> String) -> Result<T>;
}

impl<T, E> StoreContext<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn store_context(self, backend: Backend, action: impl FnOnce() -> String) -> Result<T> {
        self.map_err(|e| TransferError::connectivity(backend, action(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_tables_message_names_tables() {
        let err: TransferError =
            SchemaMismatch::MissingTables(vec!["genre".to_string(), "person".to_string()]).into();
        let msg = err.to_string();
        assert!(msg.contains("genre"));
        assert!(msg.contains("person"));
    }

    #[test]
    fn test_size_mismatch_message_reports_both_counts() {
        let err = ConsistencyError::SizeMismatch {
            table: "genre".to_string(),
            source_rows: 5,
            target_rows: 4,
        };
        assert_eq!(
            err.to_string(),
            "table 'genre' has different sizes: source=5, target=4"
        );
    }

    #[test]
    fn test_store_context_wraps_driver_error() {
        let raw: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::Other, "boom"));
        let err = raw
            .store_context(Backend::Postgres, || "listing tables".to_string())
            .unwrap_err();
        assert_eq!(err.to_string(), "postgres error while listing tables: boom");
    }
}
