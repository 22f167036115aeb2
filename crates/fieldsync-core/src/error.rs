//! Error types for `fieldsync-core`.

use thiserror::Error;

/// Configuration validation failures.
#[derive(Debug, Error)]
pub enum Error {
  #[error("table {0:?} is not configured")]
  UnknownTable(String),

  #[error("table {0:?} is configured twice")]
  DuplicateTable(String),

  #[error("table {0:?} has no unique_key")]
  MissingUniqueKey(String),

  #[error("table {0:?} has a field without a name")]
  MissingFieldName(String),

  #[error("field {field:?} of table {table:?} has no extension")]
  MissingExtension { table: String, field: String },

  #[error("field {field:?} of table {table:?} is configured twice")]
  DuplicateField { table: String, field: String },

  #[error("field {field:?} is not configured for table {table:?}")]
  UnknownField { table: String, field: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
