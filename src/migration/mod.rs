// ABOUTME: Transfer engine module
// ABOUTME: Schema inspection, the paged transfer orchestrator and the consistency verifier

pub mod consistency;
pub mod schema;
pub mod transfer;

pub use consistency::{TableVerification, Verifier, VerifyReport, VerifySettings};
pub use schema::{check_columns, check_tables, ColumnPair, ColumnRenames, SchemaInspector};
pub use transfer::{TableTransfer, Transfer, TransferReport, TransferSettings};
