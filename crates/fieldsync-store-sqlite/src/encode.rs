//! Encoding and decoding helpers between domain types and SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings. Everything else maps onto a
//! native SQLite type directly.

use chrono::{DateTime, Utc};
use fieldsync_core::model::{Entry, EntryListing, Scope, Table, UpdateSet};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Row mappers ─────────────────────────────────────────────────────────────

/// Columns: `id, remote_id, name`.
pub fn scope_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Scope> {
  Ok(Scope {
    id:        row.get(0)?,
    remote_id: row.get(1)?,
    name:      row.get(2)?,
  })
}

/// Columns: `id, remote_id, name, scope_id`.
pub fn table_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Table> {
  Ok(Table {
    id:        row.get(0)?,
    remote_id: row.get(1)?,
    name:      row.get(2)?,
    scope_id:  row.get(3)?,
  })
}

/// Columns: `id, remote_id, name, scope_id, is_current`.
pub fn update_set_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UpdateSet> {
  Ok(UpdateSet {
    id:         row.get(0)?,
    remote_id:  row.get(1)?,
    name:       row.get(2)?,
    scope_id:   row.get(3)?,
    is_current: row.get(4)?,
  })
}

// ─── Raw entry rows ──────────────────────────────────────────────────────────

/// An entry row as read from SQLite, before timestamp decoding.
pub struct RawEntry {
  pub id:            i64,
  pub remote_id:     String,
  pub unique_key:    String,
  pub table_id:      i64,
  pub scope_id:      i64,
  pub last_modified: String,
  pub table_name:    String,
  pub scope_name:    String,
}

impl RawEntry {
  /// Columns: `e.id, e.remote_id, e.unique_key, e.table_id, e.scope_id,
  /// e.last_modified, t.name, s.name`.
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:            row.get(0)?,
      remote_id:     row.get(1)?,
      unique_key:    row.get(2)?,
      table_id:      row.get(3)?,
      scope_id:      row.get(4)?,
      last_modified: row.get(5)?,
      table_name:    row.get(6)?,
      scope_name:    row.get(7)?,
    })
  }

  pub fn into_listing(self) -> Result<EntryListing> {
    Ok(EntryListing {
      entry:      Entry {
        id:            self.id,
        remote_id:     self.remote_id,
        unique_key:    self.unique_key,
        table_id:      self.table_id,
        scope_id:      self.scope_id,
        last_modified: decode_dt(&self.last_modified)?,
      },
      table_name: self.table_name,
      scope_name: self.scope_name,
    })
  }
}
