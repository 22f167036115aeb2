//! Synchronization between the remote record store, the local metadata cache
//! and the filesystem.
//!
//! [`Synchronizer`] keeps the cache consistent with the remote platform,
//! [`Transfer`] moves record fields between the remote and the files laid out
//! by [`Projection`], and [`RestClient`] is the HTTP transport.

pub mod endpoints;
pub mod error;
pub mod projection;
pub mod rest;
pub mod sync;
pub mod transfer;
mod update_sets;
pub mod wire;

pub use endpoints::Endpoints;
pub use error::{Error, Result};
pub use projection::{Projection, sanitize_key};
pub use rest::{RestClient, RestConfig};
pub use sync::{Synchronizer, WrittenEntry};
pub use transfer::{DownloadReport, Transfer, UploadReport};
