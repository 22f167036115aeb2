//! Error type for `fieldsync-sync`.

use std::path::PathBuf;

use fieldsync_core::{model::EntityKind, remote::RemoteError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A lookup the operation cannot proceed without found nothing, locally or
  /// remotely.
  #[error("{kind} not found: {key}")]
  NotFound { kind: EntityKind, key: String },

  #[error("remote error: {0}")]
  Remote(#[from] RemoteError),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("configuration error: {0}")]
  Config(#[from] fieldsync_core::Error),

  /// A remote response did not have the shape its endpoint promises.
  #[error("malformed {endpoint} response: {source}")]
  Decode {
    endpoint: &'static str,
    #[source]
    source:   serde_json::Error,
  },

  #[error("invalid remote response: {0}")]
  InvalidResponse(String),

  #[error("invalid {kind} id {id:?}: expected 32 alphanumeric characters")]
  InvalidId { kind: EntityKind, id: String },

  #[error("unique key {0:?} is empty after sanitizing")]
  InvalidUniqueKey(String),

  /// A name from the remote or the configuration would not stay a single
  /// directory level under the projection root.
  #[error("{what} {value:?} is not a single path component")]
  InvalidPathComponent { what: &'static str, value: String },

  #[error("invalid argument: {0}")]
  InvalidArgument(String),

  #[error("i/o error at {}: {source}", path.display())]
  Io {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("serialization error: {0}")]
  Encode(#[from] serde_json::Error),
}

impl Error {
  pub(crate) fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }

  pub(crate) fn not_found(kind: EntityKind, key: impl Into<String>) -> Self {
    Self::NotFound { kind, key: key.into() }
  }

  /// Whether this is a [`Error::NotFound`] for `kind`.
  pub fn is_not_found(&self, kind: EntityKind) -> bool {
    matches!(self, Self::NotFound { kind: k, .. } if *k == kind)
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
