// ABOUTME: Identifier validation, quoting and display helpers
// ABOUTME: Guards every table and column name that is interpolated into SQL

use crate::error::{Result, TransferError};

/// Longest identifier PostgreSQL keeps without truncation.
const MAX_IDENTIFIER_LEN: usize = 63;

/// Validate a table or column name before it is used in SQL text
///
/// Accepts names that start with a letter or underscore and contain only
/// ASCII letters, digits and underscores, up to 63 characters.
///
/// # Examples
///
/// ```
/// # use sqlite_pg_transfer::utils::validate_identifier;
/// assert!(validate_identifier("film_work").is_ok());
/// assert!(validate_identifier("genre; DROP TABLE genre").is_err());
/// assert!(validate_identifier("").is_err());
/// ```
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(TransferError::Config(
            "identifier cannot be empty".to_string(),
        ));
    }

    if name.len() > MAX_IDENTIFIER_LEN {
        return Err(TransferError::Config(format!(
            "identifier '{}' is longer than {} characters",
            sanitize_identifier(name),
            MAX_IDENTIFIER_LEN
        )));
    }

    let mut chars = name.chars();
    let first_ok = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);
    if !first_ok || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(TransferError::Config(format!(
            "invalid identifier '{}': only letters, digits and underscores are allowed",
            sanitize_identifier(name)
        )));
    }

    Ok(())
}

/// Double-quote an identifier, escaping embedded quotes
///
/// ```
/// # use sqlite_pg_transfer::utils::quote_ident;
/// assert_eq!(quote_ident("genre"), "\"genre\"");
/// assert_eq!(quote_ident("odd\"name"), "\"odd\"\"name\"");
/// ```
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Sanitize an identifier for display
///
/// Removes control characters and limits length to keep log lines readable.
/// This is for display only; SQL text goes through [`quote_ident`].
///
/// ```
/// # use sqlite_pg_transfer::utils::sanitize_identifier;
/// assert_eq!(sanitize_identifier("normal_table"), "normal_table");
/// assert_eq!(sanitize_identifier("table\nname"), "tablename");
/// ```
pub fn sanitize_identifier(identifier: &str) -> String {
    identifier
        .chars()
        .filter(|c| !c.is_control())
        .take(100)
        .collect()
}

/// Build a multi-row `INSERT ... ON CONFLICT (id) DO NOTHING` statement
///
/// `placeholder` renders the bind marker for a 1-based parameter number and
/// the index of the column it belongs to, so each backend can add its own casts.
pub fn upsert_sql<F>(table: &str, columns: &[String], rows: usize, placeholder: F) -> String
where
    F: Fn(usize, usize) -> String,
{
    let column_list = columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");

    let tuples = (0..rows)
        .map(|row| {
            let markers = (0..columns.len())
                .map(|idx| placeholder(row * columns.len() + idx + 1, idx))
                .collect::<Vec<_>>()
                .join(", ");
            format!("({})", markers)
        })
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "INSERT INTO {} ({}) VALUES {} ON CONFLICT (id) DO NOTHING",
        quote_ident(table),
        column_list,
        tuples
    )
}
