//! Error type for `fieldsync-store-sqlite`.

use fieldsync_core::{model::EntityKind, store::StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// An insert hit the entity's uniqueness constraint.
  #[error("{entity} {key:?} is already cached")]
  DuplicateKey { entity: EntityKind, key: String },

  #[error("entry {0:?} has an empty unique key")]
  EmptyUniqueKey(String),
}

impl StoreError for Error {
  fn is_duplicate_key(&self) -> bool { matches!(self, Self::DuplicateKey { .. }) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
