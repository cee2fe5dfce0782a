// ABOUTME: PostgreSQL store: connection, catalog introspection of the target namespace
// ABOUTME: Exports the writer and row cursor used by transfer and verification

pub mod connection;
pub mod reader;
pub mod writer;

pub use connection::connect;
pub use reader::PgRows;

use crate::config::TargetConfig;
use crate::connector::Catalog;
use crate::error::{Backend, Result, StoreContext};
use crate::utils::{quote_ident, validate_identifier};
use std::collections::HashMap;
use tokio_postgres::types::Type;
use tokio_postgres::Client;

/// A connected PostgreSQL target.
///
/// Unqualified table names resolve through the session `search_path`;
/// `schema` is the namespace whose tables are enumerated.
pub struct PgStore {
    client: Client,
    schema: String,
    in_transaction: bool,
    column_types: HashMap<String, HashMap<String, Type>>,
}

impl PgStore {
    pub async fn connect(target: &TargetConfig) -> Result<Self> {
        let config = target.pg_config()?;
        let client = connection::connect(&config).await?;
        Ok(Self::from_client(client, target.schema()))
    }

    pub fn from_client(client: Client, schema: impl Into<String>) -> Self {
        Self {
            client,
            schema: schema.into(),
            in_transaction: false,
            column_types: HashMap::new(),
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Column names and types of `table`, from describing `SELECT * FROM table`.
    pub(crate) async fn describe(&self, table: &str) -> Result<Vec<(String, Type)>> {
        validate_identifier(table)?;
        let statement = self
            .client
            .prepare(&format!("SELECT * FROM {}", quote_ident(table)))
            .await
            .store_context(Backend::Postgres, || format!("describing table '{}'", table))?;

        Ok(statement
            .columns()
            .iter()
            .map(|c| (c.name().to_string(), c.type_().clone()))
            .collect())
    }

    /// Cached column types of `table`, described on first use.
    pub(crate) async fn column_types(&mut self, table: &str) -> Result<&HashMap<String, Type>> {
        if !self.column_types.contains_key(table) {
            let described = self.describe(table).await?.into_iter().collect();
            self.column_types.insert(table.to_string(), described);
        }
        Ok(&self.column_types[table])
    }
}

impl Catalog for PgStore {
    fn backend(&self) -> Backend {
        Backend::Postgres
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        let rows = self
            .client
            .query(
                "SELECT table_name::text
                 FROM information_schema.tables
                 WHERE table_schema = $1
                 ORDER BY table_name",
                &[&self.schema],
            )
            .await
            .store_context(Backend::Postgres, || {
                format!("listing tables in schema '{}'", self.schema)
            })?;

        let tables: Vec<String> = rows.iter().map(|row| row.get(0)).collect();
        tracing::debug!(
            "Found {} tables in target schema '{}'",
            tables.len(),
            self.schema
        );
        Ok(tables)
    }

    async fn list_columns(&self, table: &str) -> Result<Vec<String>> {
        Ok(self
            .describe(table)
            .await?
            .into_iter()
            .map(|(name, _)| name)
            .collect())
    }

    async fn count_rows(&self, table: &str) -> Result<i64> {
        validate_identifier(table)?;
        let row = self
            .client
            .query_one(&format!("SELECT count(id) FROM {}", quote_ident(table)), &[])
            .await
            .store_context(Backend::Postgres, || format!("counting rows of '{}'", table))?;
        Ok(row.get(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // NOTE: These tests require a real PostgreSQL instance
    // Skip if TEST_TARGET_URL is not set

    async fn store() -> PgStore {
        let url = std::env::var("TEST_TARGET_URL")
            .expect("TEST_TARGET_URL must be set for integration tests");
        let config: tokio_postgres::Config = url.parse().unwrap();
        let client = connect(&config).await.unwrap();
        PgStore::from_client(client, "public")
    }

    #[tokio::test]
    #[ignore]
    async fn test_list_tables_and_columns() {
        let store = store().await;
        store
            .client()
            .batch_execute(
                "CREATE TABLE IF NOT EXISTS catalog_probe (id uuid PRIMARY KEY, name text, modified timestamptz)",
            )
            .await
            .unwrap();

        let tables = store.list_tables().await.unwrap();
        assert!(tables.contains(&"catalog_probe".to_string()));

        let columns = store.list_columns("catalog_probe").await.unwrap();
        assert_eq!(columns, vec!["id", "name", "modified"]);
        assert_eq!(store.count_rows("catalog_probe").await.unwrap(), 0);

        store
            .client()
            .batch_execute("DROP TABLE catalog_probe")
            .await
            .unwrap();
    }
}
