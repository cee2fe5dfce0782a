// ABOUTME: Multi-row conflict-skipping upsert into PostgreSQL tables
// ABOUTME: Values travel as text and are cast to each target column's described type

use super::PgStore;
use crate::connector::BatchWriter;
use crate::error::{Backend, Result, SchemaMismatch, StoreContext};
use crate::utils::{quote_ident, upsert_sql, validate_identifier};
use crate::value::{Record, Value};
use tokio_postgres::types::{ToSql, Type};

/// Bind parameter limit of the PostgreSQL wire protocol.
const MAX_BIND_PARAMS: usize = 65_535;

/// Fully qualified cast target for a column type, e.g. `"pg_catalog"."uuid"`.
pub(crate) fn type_cast(ty: &Type) -> String {
    format!("{}.{}", quote_ident(ty.schema()), quote_ident(ty.name()))
}

impl BatchWriter for PgStore {
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

        let types = self.column_types(table).await?;
        let mut casts = Vec::with_capacity(columns.len());
        let mut missing = Vec::new();
        for column in columns {
            match types.get(column) {
                Some(ty) => casts.push(type_cast(ty)),
                None => missing.push(column.clone()),
            }
        }
        if !missing.is_empty() {
            return Err(SchemaMismatch::MissingColumns {
                table: table.to_string(),
                columns: missing,
            }
            .into());
        }

        let action = || format!("writing a batch into '{}'", table);
        if !self.in_transaction {
            self.client
                .batch_execute("BEGIN")
                .await
                .store_context(Backend::Postgres, action)?;
            self.in_transaction = true;
        }

        let rows_per_statement = (MAX_BIND_PARAMS / columns.len()).max(1);
        let mut inserted = 0;
        for chunk in records.chunks(rows_per_statement) {
            let sql = upsert_sql(table, columns, chunk.len(), |n, idx| {
                format!("${}::text::{}", n, casts[idx])
            });
            let values: Vec<Option<String>> = chunk
                .iter()
                .flat_map(|r| r.values.iter().map(Value::to_text))
                .collect();
            let params: Vec<&(dyn ToSql + Sync)> =
                values.iter().map(|v| v as &(dyn ToSql + Sync)).collect();

            inserted += self
                .client
                .execute(sql.as_str(), &params)
                .await
                .store_context(Backend::Postgres, action)?;
        }

        Ok(inserted)
    }

    async fn commit(&mut self) -> Result<()> {
        if self.in_transaction {
            self.client
                .batch_execute("COMMIT")
                .await
                .store_context(Backend::Postgres, || "committing".to_string())?;
            self.in_transaction = false;
        }
        Ok(())
    }
}
