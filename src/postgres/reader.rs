// ABOUTME: Id-ordered row streaming from PostgreSQL for consistency checks
// ABOUTME: Decodes common scalar types natively and everything else through ::text

use super::PgStore;
use crate::connector::{OrderedRows, RowCursor};
use crate::error::{Backend, Result, SchemaMismatch, StoreContext};
use crate::utils::{quote_ident, validate_identifier};
use crate::value::Value;
use futures::StreamExt;
use std::pin::Pin;
use tokio_postgres::types::Type;
use tokio_postgres::{Row, RowStream};

/// Types decoded straight into [`Value`]; anything else is selected as text.
///
/// `real` goes through text so it compares at its own precision.
fn is_native(ty: &Type) -> bool {
    [
        Type::BOOL,
        Type::INT2,
        Type::INT4,
        Type::INT8,
        Type::FLOAT8,
        Type::TEXT,
        Type::VARCHAR,
        Type::BPCHAR,
        Type::NAME,
        Type::BYTEA,
    ]
    .contains(ty)
}

fn select_expr(column: &str, ty: &Type) -> String {
    if is_native(ty) {
        quote_ident(column)
    } else {
        format!("{}::text", quote_ident(column))
    }
}

fn decode(row: &Row, idx: usize) -> std::result::Result<Value, tokio_postgres::Error> {
    let ty = row.columns()[idx].type_();
    let value = if *ty == Type::BOOL {
        row.try_get::<_, Option<bool>>(idx)?
            .map(|b| Value::Integer(i64::from(b)))
    } else if *ty == Type::INT2 {
        row.try_get::<_, Option<i16>>(idx)?
            .map(|i| Value::Integer(i64::from(i)))
    } else if *ty == Type::INT4 {
        row.try_get::<_, Option<i32>>(idx)?
            .map(|i| Value::Integer(i64::from(i)))
    } else if *ty == Type::INT8 {
        row.try_get::<_, Option<i64>>(idx)?.map(Value::Integer)
    } else if *ty == Type::FLOAT8 {
        row.try_get::<_, Option<f64>>(idx)?.map(Value::Real)
    } else if *ty == Type::BYTEA {
        row.try_get::<_, Option<Vec<u8>>>(idx)?.map(Value::Blob)
    } else {
        row.try_get::<_, Option<String>>(idx)?.map(Value::Text)
    };
    Ok(value.unwrap_or(Value::Null))
}

/// Lazily streamed rows of one table, ordered by `id`.
pub struct PgRows {
    table: String,
    stream: Pin<Box<RowStream>>,
}

impl RowCursor for PgRows {
    async fn next_row(&mut self) -> Result<Option<Vec<Value>>> {
        let table = self.table.as_str();
        let action = || format!("streaming rows of '{}'", table);

        let Some(row) = self.stream.next().await else {
            return Ok(None);
        };
        let row = row.store_context(Backend::Postgres, action)?;

        let values = (0..row.len())
            .map(|idx| decode(&row, idx))
            .collect::<std::result::Result<Vec<_>, _>>()
            .store_context(Backend::Postgres, action)?;
        Ok(Some(values))
    }
}

impl OrderedRows for PgStore {
    type Cursor<'a> = PgRows
    where
        Self: 'a;

    async fn rows_by_id<'a>(&'a self, table: &str, columns: &[String]) -> Result<PgRows> {
        let types = self.describe(table).await?;

        let mut exprs = Vec::with_capacity(columns.len());
        let mut missing = Vec::new();
        for column in columns {
            validate_identifier(column)?;
            match types.iter().find(|(name, _)| name == column) {
                Some((_, ty)) => exprs.push(select_expr(column, ty)),
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

        let sql = format!(
            "SELECT {} FROM {} ORDER BY id",
            exprs.join(", "),
            quote_ident(table)
        );
        let stream = self
            .client()
            .query_raw(sql.as_str(), std::iter::empty::<String>())
            .await
            .store_context(Backend::Postgres, || format!("streaming rows of '{}'", table))?;

        Ok(PgRows {
            table: table.to_string(),
            stream: Box::pin(stream),
        })
    }
}
