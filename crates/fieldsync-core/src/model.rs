//! Cached entities.
//!
//! Every entity carries the remote platform's opaque id (`remote_id`) and the
//! local autoincrement id the cache assigns on insert. Relationships between
//! cached rows always go through local ids.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Local autoincrement row id.
pub type LocalId = i64;

// ─── Entity kinds ────────────────────────────────────────────────────────────

/// The four kinds of cached entity, used to label lookups and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
  Scope,
  Table,
  Entry,
  UpdateSet,
}

impl fmt::Display for EntityKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Scope => "scope",
      Self::Table => "table",
      Self::Entry => "entry",
      Self::UpdateSet => "update set",
    })
  }
}

// ─── Entities ────────────────────────────────────────────────────────────────

/// A remote namespace that tables, records and update sets belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
  pub id:        LocalId,
  pub remote_id: String,
  pub name:      String,
}

/// A remote table definition. Keyed by `name` in the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
  pub id:        LocalId,
  pub remote_id: String,
  pub name:      String,
  pub scope_id:  LocalId,
}

/// One downloaded remote record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
  pub id:            LocalId,
  pub remote_id:     String,
  /// Sanitized value of the table's configured unique-key field.
  pub unique_key:    String,
  pub table_id:      LocalId,
  pub scope_id:      LocalId,
  pub last_modified: DateTime<Utc>,
}

/// A remote change-tracking container.
///
/// `is_current` is not stored per row; it is computed from the owning scope's
/// current-update-set pointer when the row is read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSet {
  pub id:         LocalId,
  pub remote_id:  String,
  pub name:       String,
  pub scope_id:   LocalId,
  pub is_current: bool,
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Input for [`CacheStore::insert_entry`](crate::store::CacheStore::insert_entry).
#[derive(Debug, Clone)]
pub struct NewEntry {
  pub remote_id:     String,
  pub unique_key:    String,
  pub table_id:      LocalId,
  pub scope_id:      LocalId,
  pub last_modified: DateTime<Utc>,
}

/// Input for
/// [`CacheStore::insert_update_set`](crate::store::CacheStore::insert_update_set).
#[derive(Debug, Clone)]
pub struct NewUpdateSet {
  pub remote_id:  String,
  pub name:       String,
  pub scope_id:   LocalId,
  pub is_current: bool,
}

// ─── Read models ─────────────────────────────────────────────────────────────

/// Where an entry's files live: everything needed to rebuild its directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryLocation {
  pub unique_key: String,
  pub scope_name: String,
}

/// An entry joined with the names of its table and scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryListing {
  pub entry:      Entry,
  pub table_name: String,
  pub scope_name: String,
}
