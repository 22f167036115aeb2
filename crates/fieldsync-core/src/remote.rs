//! The `RemoteClient` trait: authenticated access to the platform's REST API.
//!
//! Implementations own transport, authentication and headers. Callers hand
//! over complete URLs and get raw response bodies back.

use std::future::Future;

use thiserror::Error;

/// A failed remote call. Never retried.
#[derive(Debug, Error)]
pub enum RemoteError {
  #[error("{method} {url} failed: {message}")]
  Transport {
    method:  &'static str,
    url:     String,
    message: String,
  },

  #[error("{method} {url} returned HTTP {status}")]
  Status {
    method: &'static str,
    url:    String,
    status: u16,
  },
}

/// Blocking-per-call access to the remote record store.
pub trait RemoteClient: Send + Sync {
  /// `GET url`, returning the body of a successful response.
  fn get<'a>(
    &'a self,
    url: &'a str,
  ) -> impl Future<Output = Result<Vec<u8>, RemoteError>> + Send + 'a;

  /// `PUT url` with a JSON `body`, returning the body of a successful
  /// response.
  fn put<'a>(
    &'a self,
    url: &'a str,
    body: Vec<u8>,
  ) -> impl Future<Output = Result<Vec<u8>, RemoteError>> + Send + 'a;
}
