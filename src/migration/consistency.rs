// ABOUTME: Post-transfer consistency verifier comparing source and target row by row
// ABOUTME: Checks row counts first, then walks both stores in id order in lock-step

use super::schema::{ColumnRenames, SchemaInspector};
use crate::config::Config;
use crate::connector::{Catalog, OrderedRows, RowCursor};
use crate::error::{ConsistencyError, Result};
use crate::utils::{sanitize_identifier, validate_identifier};
use crate::value::{values_match, Value};
use indicatif::ProgressBar;
use std::collections::HashSet;

/// Settings the verifier runs with.
#[derive(Debug, Clone)]
pub struct VerifySettings {
    /// Tables to compare; not re-discovered from either store.
    pub tables: Vec<String>,
    pub ignored_columns: HashSet<String>,
    pub renames: ColumnRenames,
}

impl From<&Config> for VerifySettings {
    fn from(config: &Config) -> Self {
        Self {
            tables: config.verify.tables.clone(),
            ignored_columns: config.verify.ignored_columns.iter().cloned().collect(),
            renames: config.columns.rename.clone(),
        }
    }
}

/// Per-table outcome of a successful verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableVerification {
    pub table: String,
    pub rows: i64,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    pub tables: Vec<TableVerification>,
}

/// Compares a fixed list of tables between two stores; stops at the first difference.
pub struct Verifier {
    settings: VerifySettings,
    progress: ProgressBar,
}

impl Verifier {
    pub fn new(settings: VerifySettings) -> Self {
        Self {
            settings,
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub async fn run<S, T>(&self, source: &S, target: &T) -> Result<VerifyReport>
    where
        S: Catalog + OrderedRows,
        T: Catalog + OrderedRows,
    {
        let result = self.run_tables(source, target).await;
        if let Err(e) = &result {
            tracing::error!("Verification failed: {}", e);
        }
        result
    }

    async fn run_tables<S, T>(&self, source: &S, target: &T) -> Result<VerifyReport>
    where
        S: Catalog + OrderedRows,
        T: Catalog + OrderedRows,
    {
        let inspector = SchemaInspector::new(&self.settings.renames);
        self.progress.set_length(self.settings.tables.len() as u64);

        let mut report = VerifyReport::default();
        for table in &self.settings.tables {
            self.progress
                .set_message(format!("Verifying {}", sanitize_identifier(table)));
            let outcome = self.verify_table(&inspector, source, target, table).await?;
            tracing::info!(
                "  ✓ {}: {} rows match on {} columns",
                sanitize_identifier(table),
                outcome.rows,
                outcome.columns.len()
            );
            report.tables.push(outcome);
            self.progress.inc(1);
        }
        Ok(report)
    }

    async fn verify_table<S, T>(
        &self,
        inspector: &SchemaInspector<'_>,
        source: &S,
        target: &T,
        table: &str,
    ) -> Result<TableVerification>
    where
        S: Catalog + OrderedRows,
        T: Catalog + OrderedRows,
    {
        tracing::debug!("Start verifying table '{}'", sanitize_identifier(table));
        validate_identifier(table)?;

        let source_rows = source.count_rows(table).await?;
        let target_rows = target.count_rows(table).await?;
        tracing::debug!(
            "'{}' has {} rows in {}, {} in {}",
            sanitize_identifier(table),
            source_rows,
            source.backend(),
            target_rows,
            target.backend()
        );
        if source_rows != target_rows {
            return Err(ConsistencyError::SizeMismatch {
                table: table.to_string(),
                source_rows,
                target_rows,
            }
            .into());
        }

        let pairs: Vec<_> = inspector
            .column_pairs(source, table)
            .await?
            .into_iter()
            .filter(|pair| {
                !self.settings.ignored_columns.contains(&pair.source)
                    && !self.settings.ignored_columns.contains(&pair.target)
            })
            .collect();
        let source_columns: Vec<String> = pairs.iter().map(|p| p.source.clone()).collect();
        let target_columns: Vec<String> = pairs.iter().map(|p| p.target.clone()).collect();
        let id_position = source_columns.iter().position(|c| c == "id");

        if !pairs.is_empty() {
            let mut source_cursor = source.rows_by_id(table, &source_columns).await?;
            let mut target_cursor = target.rows_by_id(table, &target_columns).await?;

            let mut row_number = 0u64;
            loop {
                let source_row = source_cursor.next_row().await?;
                let target_row = target_cursor.next_row().await?;
                let (source_row, target_row) = match (source_row, target_row) {
                    (Some(s), Some(t)) => (s, t),
                    (None, None) => break,
                    (None, Some(_)) => {
                        return Err(unexpected_end(table, "source", row_number));
                    }
                    (Some(_), None) => {
                        return Err(unexpected_end(table, "target", row_number));
                    }
                };
                row_number += 1;
                tracing::trace!("Compare {:?} and {:?}", source_row, target_row);

                compare_rows(
                    table,
                    row_number,
                    &source_columns,
                    id_position,
                    &source_row,
                    &target_row,
                )?;
            }
        }

        tracing::debug!("Finish verifying table '{}'", sanitize_identifier(table));
        Ok(TableVerification {
            table: table.to_string(),
            rows: source_rows,
            columns: source_columns,
        })
    }
}

fn unexpected_end(table: &str, side: &'static str, row: u64) -> crate::error::TransferError {
    ConsistencyError::UnexpectedEnd {
        table: table.to_string(),
        side,
        row,
    }
    .into()
}

/// Positional comparison of one row; the first differing column is reported.
fn compare_rows(
    table: &str,
    row_number: u64,
    columns: &[String],
    id_position: Option<usize>,
    source_row: &[Value],
    target_row: &[Value],
) -> Result<(), ConsistencyError> {
    for (idx, column) in columns.iter().enumerate() {
        let source_value = source_row.get(idx).unwrap_or(&Value::Null);
        let target_value = target_row.get(idx).unwrap_or(&Value::Null);
        if !values_match(source_value, target_value) {
            let id = id_position
                .and_then(|pos| source_row.get(pos))
                .map(|v| v.to_string())
                .unwrap_or_else(|| "?".to_string());
            return Err(ConsistencyError::ValueMismatch {
                table: table.to_string(),
                row: row_number,
                id,
                column: column.clone(),
                source_value: source_value.to_string(),
                target_value: target_value.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Backend, TransferError};

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    /// A store whose reported row count need not agree with the rows it yields.
    struct StubStore {
        count: i64,
        rows: Vec<Vec<Value>>,
    }

    struct StubRows {
        rows: std::vec::IntoIter<Vec<Value>>,
    }

    impl RowCursor for StubRows {
        async fn next_row(&mut self) -> Result<Option<Vec<Value>>> {
            Ok(self.rows.next())
        }
    }

    impl Catalog for StubStore {
        fn backend(&self) -> Backend {
            Backend::Sqlite
        }

        async fn list_tables(&self) -> Result<Vec<String>> {
            Ok(vec!["genre".to_string()])
        }

        async fn list_columns(&self, _table: &str) -> Result<Vec<String>> {
            Ok(vec!["id".to_string(), "name".to_string()])
        }

        async fn count_rows(&self, _table: &str) -> Result<i64> {
            Ok(self.count)
        }
    }

    impl OrderedRows for StubStore {
        type Cursor<'a> = StubRows
        where
            Self: 'a;

        async fn rows_by_id<'a>(&'a self, _table: &str, _columns: &[String]) -> Result<StubRows> {
            Ok(StubRows {
                rows: self.rows.clone().into_iter(),
            })
        }
    }

    fn genres(n: usize) -> Vec<Vec<Value>> {
        (0..n)
            .map(|i| vec![text(&format!("g{}", i)), text(&format!("Genre {}", i))])
            .collect()
    }

    fn genre_settings() -> VerifySettings {
        VerifySettings {
            tables: vec!["genre".to_string()],
            ignored_columns: HashSet::new(),
            renames: ColumnRenames::default(),
        }
    }

    #[tokio::test]
    async fn test_cursor_ending_early_is_reported() {
        let full = StubStore {
            count: 3,
            rows: genres(3),
        };
        let short = StubStore {
            count: 3,
            rows: genres(2),
        };
        let verifier = Verifier::new(genre_settings());

        let err = verifier.run(&full, &short).await.unwrap_err();
        assert!(matches!(
            err,
            TransferError::Consistency(ConsistencyError::UnexpectedEnd { side: "target", row: 2, .. })
        ));

        let err = verifier.run(&short, &full).await.unwrap_err();
        assert!(matches!(
            err,
            TransferError::Consistency(ConsistencyError::UnexpectedEnd { side: "source", row: 2, .. })
        ));
    }

    #[tokio::test]
    async fn test_matching_stub_stores_verify() {
        let source = StubStore {
            count: 2,
            rows: genres(2),
        };
        let target = StubStore {
            count: 2,
            rows: genres(2),
        };
        let report = Verifier::new(genre_settings())
            .run(&source, &target)
            .await
            .unwrap();
        assert_eq!(report.tables[0].rows, 2);
        assert_eq!(report.tables[0].columns, vec!["id".to_string(), "name".to_string()]);
    }

    #[test]
    fn test_compare_rows_reports_first_difference() {
        let columns = vec![
            "id".to_string(),
            "full_name".to_string(),
            "role".to_string(),
        ];
        let err = compare_rows(
            "person",
            2,
            &columns,
            Some(0),
            &[text("p2"), text("Jane Doe"), text("actor")],
            &[text("p2"), text("Jane D."), text("director")],
        )
        .unwrap_err();

        assert_eq!(
            err,
            ConsistencyError::ValueMismatch {
                table: "person".to_string(),
                row: 2,
                id: "\"p2\"".to_string(),
                column: "full_name".to_string(),
                source_value: "\"Jane Doe\"".to_string(),
                target_value: "\"Jane D.\"".to_string(),
            }
        );
    }

    #[test]
    fn test_compare_rows_accepts_numeric_text_ratings() {
        let columns = vec!["id".to_string(), "rating".to_string()];
        // numeric(3,1) and real columns are both read back as text
        for target in ["8.5", "8.50"] {
            assert!(compare_rows(
                "film_work",
                1,
                &columns,
                Some(0),
                &[text("f1"), Value::Real(8.5)],
                &[text("f1"), text(target)],
            )
            .is_ok());
        }
        assert!(compare_rows(
            "film_work",
            1,
            &columns,
            Some(0),
            &[text("f1"), Value::Real(8.3)],
            &[text("f1"), text("8.3")],
        )
        .is_ok());

        let err = compare_rows(
            "film_work",
            1,
            &columns,
            Some(0),
            &[text("f1"), Value::Real(8.5)],
            &[text("f1"), text("7.9")],
        )
        .unwrap_err();
        assert!(matches!(err, ConsistencyError::ValueMismatch { ref column, .. } if column == "rating"));
    }

    #[test]
    fn test_compare_rows_treats_empty_values_as_equal() {
        let columns = vec!["id".to_string(), "description".to_string()];
        assert!(compare_rows(
            "genre",
            1,
            &columns,
            Some(0),
            &[text("g1"), Value::Null],
            &[text("g1"), text("")],
        )
        .is_ok());
    }
}
