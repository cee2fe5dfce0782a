// ABOUTME: Backend-neutral row values, records and pages
// ABOUTME: Defines the cross-engine equality rule used by the consistency verifier

use std::fmt;
use std::sync::Arc;

/// A single column value, as read from either store.
///
/// The variants follow SQLite's storage classes; PostgreSQL values that have
/// no direct counterpart are carried as their text representation.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    /// Null, empty text, numeric zero and empty blobs are all "empty".
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Integer(i) => *i == 0,
            Value::Real(f) => *f == 0.0,
            Value::Text(s) => s.is_empty(),
            Value::Blob(b) => b.is_empty(),
        }
    }

    /// Text form sent to PostgreSQL, where it is cast to the column type.
    ///
    /// Blobs are rendered in `bytea` hex input format.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Integer(i) => Some(i.to_string()),
            Value::Real(f) => Some(f.to_string()),
            Value::Text(s) => Some(s.clone()),
            Value::Blob(b) => Some(format!("\\x{}", hex(b))),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Real(r) => write!(f, "{}", r),
            Value::Text(s) => write!(f, "{:?}", s),
            Value::Blob(b) => write!(f, "x'{}'", hex(b)),
        }
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Compare a source value with a target value.
///
/// Two empty values match whatever their concrete representation; otherwise
/// values must be equal, with integers and reals compared numerically.
/// A number also matches text that parses to the same number, which is how
/// PostgreSQL `numeric` and `real` columns are read back.
pub fn values_match(source: &Value, target: &Value) -> bool {
    if source.is_empty() && target.is_empty() {
        return true;
    }
    match (source, target) {
        (Value::Integer(i), Value::Real(r)) | (Value::Real(r), Value::Integer(i)) => {
            *i as f64 == *r
        }
        (number @ (Value::Integer(_) | Value::Real(_)), Value::Text(text))
        | (Value::Text(text), number @ (Value::Integer(_) | Value::Real(_))) => {
            numeric_text_matches(number, text)
        }
        _ => source == target,
    }
}

fn numeric_text_matches(number: &Value, text: &str) -> bool {
    let Ok(parsed) = text.trim().parse::<f64>() else {
        return false;
    };
    match number {
        Value::Integer(i) => text.trim().parse::<i64>().map_or(*i as f64 == parsed, |t| t == *i),
        Value::Real(r) => *r == parsed,
        _ => false,
    }
}

/// One row, aligned to the column order of the page it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub values: Vec<Value>,
}

impl Record {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }
}

/// A bounded batch of records sharing one column order.
#[derive(Debug, Clone)]
pub struct Page {
    pub columns: Arc<[String]>,
    pub records: Vec<Record>,
}

impl Page {
    pub fn empty(columns: Arc<[String]>) -> Self {
        Self {
            columns,
            records: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
