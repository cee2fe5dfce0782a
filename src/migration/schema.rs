// ABOUTME: Schema inspection and the table/column superset gate
// ABOUTME: Applies the source-to-target column rename map when reading source names

use crate::connector::Catalog;
use crate::error::{Result, SchemaMismatch};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};

/// Fixed mapping from source column names to target column names.
///
/// Only names are rewritten; values pass through unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct ColumnRenames(BTreeMap<String, String>);

impl ColumnRenames {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Target name for a source column; unmapped names are returned as-is.
    pub fn apply<'a>(&'a self, column: &'a str) -> &'a str {
        self.0.get(column).map(String::as_str).unwrap_or(column)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// A source column and the target column it lands in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnPair {
    pub source: String,
    pub target: String,
}

/// Discovers tables and columns on either side of a transfer
///
/// All methods are read-only and may be called repeatedly.
pub struct SchemaInspector<'r> {
    renames: &'r ColumnRenames,
}

impl<'r> SchemaInspector<'r> {
    pub fn new(renames: &'r ColumnRenames) -> Self {
        Self { renames }
    }

    pub async fn list_source_tables<S: Catalog>(&self, source: &S) -> Result<Vec<String>> {
        source.list_tables().await
    }

    pub async fn list_target_tables<T: Catalog>(&self, target: &T) -> Result<Vec<String>> {
        target.list_tables().await
    }

    /// Source column names of `table` after renaming.
    pub async fn list_source_columns<S: Catalog>(&self, source: &S, table: &str) -> Result<Vec<String>> {
        Ok(self
            .column_pairs(source, table)
            .await?
            .into_iter()
            .map(|pair| pair.target)
            .collect())
    }

    /// Target column names of `table`, unchanged.
    pub async fn list_target_columns<T: Catalog>(&self, target: &T, table: &str) -> Result<Vec<String>> {
        target.list_columns(table).await
    }

    /// Source columns of `table` paired with their renamed target names.
    pub async fn column_pairs<S: Catalog>(&self, source: &S, table: &str) -> Result<Vec<ColumnPair>> {
        Ok(source
            .list_columns(table)
            .await?
            .into_iter()
            .map(|column| ColumnPair {
                target: self.renames.apply(&column).to_string(),
                source: column,
            })
            .collect())
    }

    pub fn rename(&self, column: &str) -> String {
        self.renames.apply(column).to_string()
    }
}

/// Entries of `required` absent from `available`, in `required` order.
pub fn missing_from(required: &[String], available: &[String]) -> Vec<String> {
    let available: HashSet<&str> = available.iter().map(String::as_str).collect();
    required
        .iter()
        .filter(|name| !available.contains(name.as_str()))
        .cloned()
        .collect()
}

/// Every source table must exist in the target.
pub fn check_tables(source: &[String], target: &[String]) -> Result<(), SchemaMismatch> {
    let missing = missing_from(source, target);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(SchemaMismatch::MissingTables(missing))
    }
}

/// Every renamed source column of `table` must exist in the target table.
pub fn check_columns(table: &str, source: &[String], target: &[String]) -> Result<(), SchemaMismatch> {
    let missing = missing_from(source, target);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(SchemaMismatch::MissingColumns {
            table: table.to_string(),
            columns: missing,
        })
    }
}
