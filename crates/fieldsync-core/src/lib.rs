//! Core types and trait definitions for fieldsync.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! cache backend (`fieldsync-store-sqlite`) and the synchronization layer
//! (`fieldsync-sync`) both depend on it.

pub mod config;
pub mod error;
pub mod model;
pub mod remote;
pub mod store;

pub use error::{Error, Result};

/// Remote id of the platform's global scope. Unlike every other remote id it
/// is not 32 characters long.
pub const GLOBAL_SCOPE: &str = "global";

/// Length of a remote record identifier.
pub const REMOTE_ID_LEN: usize = 32;

/// Whether `id` has the shape of a remote record identifier.
pub fn is_remote_id(id: &str) -> bool {
  id.len() == REMOTE_ID_LEN && id.chars().all(|c| c.is_ascii_alphanumeric())
}
