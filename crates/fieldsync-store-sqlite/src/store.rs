//! [`SqliteStore`]: the SQLite implementation of [`CacheStore`].

use std::path::Path;

use rusqlite::OptionalExtension as _;

use fieldsync_core::{
  model::{
    EntityKind, EntryListing, EntryLocation, LocalId, NewEntry, NewUpdateSet, Scope, Table,
    UpdateSet,
  },
  store::CacheStore,
};

use crate::{
  encode::{encode_dt, scope_from_row, table_from_row, update_set_from_row, RawEntry},
  schema::{CONNECTION_PRAGMAS, SCHEMA, SCHEMA_VERSION},
  Error, Result,
};

const UPDATE_SET_COLUMNS: &str = "
  SELECT u.id, u.remote_id, u.name, u.scope_id,
         COALESCE(s.current_update_set = u.id, 0) AS is_current
  FROM update_sets u
  JOIN scopes s ON s.id = u.scope_id";

const ENTRY_COLUMNS: &str = "
  SELECT e.id, e.remote_id, e.unique_key, e.table_id, e.scope_id, e.last_modified,
         t.name, s.name
  FROM entries e
  JOIN remote_tables t ON t.id = e.table_id
  JOIN scopes s        ON s.id = e.scope_id";

/// Whether `err` is a UNIQUE / PRIMARY KEY constraint violation.
fn is_unique_violation(err: &rusqlite::Error) -> bool {
  matches!(
    err,
    rusqlite::Error::SqliteFailure(e, _)
      if e.code == rusqlite::ErrorCode::ConstraintViolation
        && (e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
          || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
  )
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// The fieldsync metadata cache backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a cache at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory cache, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Enable per-connection settings, then create the schema unless the file
  /// already carries it.
  async fn init_schema(&self) -> Result<()> {
    let created = self
      .conn
      .call(|conn| {
        conn.execute_batch(CONNECTION_PRAGMAS)?;
        let version: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
        if version >= SCHEMA_VERSION {
          return Ok(false);
        }
        conn.execute_batch(SCHEMA)?;
        Ok(true)
      })
      .await?;

    if created {
      tracing::debug!(version = SCHEMA_VERSION, "created cache schema");
    }
    Ok(())
  }

  /// The schema version recorded in the database file.
  pub async fn schema_version(&self) -> Result<i64> {
    let version = self
      .conn
      .call(|conn| Ok(conn.query_row("PRAGMA user_version", [], |r| r.get(0))?))
      .await?;
    Ok(version)
  }
}

// ─── CacheStore impl ─────────────────────────────────────────────────────────

impl CacheStore for SqliteStore {
  type Error = Error;

  // ── Scopes ────────────────────────────────────────────────────────────────

  async fn find_scope_by_remote_id<'a>(&'a self, remote_id: &'a str) -> Result<Option<Scope>> {
    let remote_id = remote_id.to_owned();

    let scope = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT id, remote_id, name FROM scopes WHERE remote_id = ?1",
            rusqlite::params![remote_id],
            scope_from_row,
          )
          .optional()?)
      })
      .await?;
    Ok(scope)
  }

  async fn find_scope_by_name<'a>(&'a self, name: &'a str) -> Result<Option<Scope>> {
    let name = name.to_owned();

    let scope = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT id, remote_id, name FROM scopes WHERE name = ?1 ORDER BY id LIMIT 1",
            rusqlite::params![name],
            scope_from_row,
          )
          .optional()?)
      })
      .await?;
    Ok(scope)
  }

  async fn insert_scope<'a>(&'a self, remote_id: &'a str, name: &'a str) -> Result<Scope> {
    let remote_id_str = remote_id.to_owned();
    let name_str      = name.to_owned();

    let inserted = self
      .conn
      .call(move |conn| {
        let result = conn.execute(
          "INSERT INTO scopes (remote_id, name) VALUES (?1, ?2)",
          rusqlite::params![remote_id_str, name_str],
        );
        match result {
          Ok(_) => Ok(Some(Scope {
            id:        conn.last_insert_rowid(),
            remote_id: remote_id_str,
            name:      name_str,
          })),
          Err(e) if is_unique_violation(&e) => Ok(None),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    inserted.ok_or_else(|| Error::DuplicateKey {
      entity: EntityKind::Scope,
      key:    remote_id.to_owned(),
    })
  }

  async fn list_scopes(&self) -> Result<Vec<Scope>> {
    let scopes = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare("SELECT id, remote_id, name FROM scopes ORDER BY id")?;
        let rows = stmt
          .query_map([], scope_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(scopes)
  }

  async fn forget_scope<'a>(&'a self, name: &'a str) -> Result<bool> {
    let name = name.to_owned();

    let removed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let ids: Vec<i64> = {
          let mut stmt = tx.prepare("SELECT id FROM scopes WHERE name = ?1")?;
          stmt
            .query_map(rusqlite::params![name], |r| r.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };

        for id in &ids {
          tx.execute(
            "UPDATE scopes SET current_update_set = NULL
             WHERE id = ?1
                OR current_update_set IN (SELECT id FROM update_sets WHERE scope_id = ?1)",
            rusqlite::params![id],
          )?;
          tx.execute("DELETE FROM update_sets WHERE scope_id = ?1", rusqlite::params![id])?;
          tx.execute(
            "DELETE FROM entries
             WHERE scope_id = ?1
                OR table_id IN (SELECT id FROM remote_tables WHERE scope_id = ?1)",
            rusqlite::params![id],
          )?;
          tx.execute("DELETE FROM remote_tables WHERE scope_id = ?1", rusqlite::params![id])?;
          tx.execute("DELETE FROM scopes WHERE id = ?1", rusqlite::params![id])?;
        }

        tx.commit()?;
        Ok(!ids.is_empty())
      })
      .await?;
    Ok(removed)
  }

  // ── Tables ────────────────────────────────────────────────────────────────

  async fn find_table_by_name<'a>(&'a self, name: &'a str) -> Result<Option<Table>> {
    let name = name.to_owned();

    let table = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT id, remote_id, name, scope_id FROM remote_tables WHERE name = ?1",
            rusqlite::params![name],
            table_from_row,
          )
          .optional()?)
      })
      .await?;
    Ok(table)
  }

  async fn insert_table<'a>(
    &'a self,
    remote_id: &'a str,
    name:      &'a str,
    scope_id:  LocalId,
  ) -> Result<Table> {
    let remote_id_str = remote_id.to_owned();
    let name_str      = name.to_owned();

    let inserted = self
      .conn
      .call(move |conn| {
        let result = conn.execute(
          "INSERT INTO remote_tables (remote_id, name, scope_id) VALUES (?1, ?2, ?3)",
          rusqlite::params![remote_id_str, name_str, scope_id],
        );
        match result {
          Ok(_) => Ok(Some(Table {
            id:        conn.last_insert_rowid(),
            remote_id: remote_id_str,
            name:      name_str,
            scope_id,
          })),
          Err(e) if is_unique_violation(&e) => Ok(None),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    inserted.ok_or_else(|| Error::DuplicateKey {
      entity: EntityKind::Table,
      key:    name.to_owned(),
    })
  }

  async fn list_tables(&self) -> Result<Vec<Table>> {
    let tables = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT id, remote_id, name, scope_id FROM remote_tables ORDER BY id")?;
        let rows = stmt
          .query_map([], table_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(tables)
  }

  async fn forget_table<'a>(&'a self, name: &'a str) -> Result<bool> {
    let name = name.to_owned();

    let removed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let id: Option<i64> = tx
          .query_row(
            "SELECT id FROM remote_tables WHERE name = ?1",
            rusqlite::params![name],
            |r| r.get(0),
          )
          .optional()?;

        let Some(id) = id else {
          return Ok(false);
        };

        tx.execute("DELETE FROM entries WHERE table_id = ?1", rusqlite::params![id])?;
        tx.execute("DELETE FROM remote_tables WHERE id = ?1", rusqlite::params![id])?;
        tx.commit()?;
        Ok(true)
      })
      .await?;
    Ok(removed)
  }

  // ── Entries ───────────────────────────────────────────────────────────────

  async fn entry_exists<'a>(
    &'a self,
    table_id:  LocalId,
    remote_id: &'a str,
    scope_id:  LocalId,
  ) -> Result<bool> {
    let remote_id = remote_id.to_owned();

    let exists = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT 1 FROM entries WHERE remote_id = ?1 AND table_id = ?2 AND scope_id = ?3",
            rusqlite::params![remote_id, table_id, scope_id],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false))
      })
      .await?;
    Ok(exists)
  }

  async fn insert_entry(&self, entry: NewEntry) -> Result<bool> {
    if entry.unique_key.is_empty() {
      return Err(Error::EmptyUniqueKey(entry.remote_id));
    }

    let last_modified = encode_dt(entry.last_modified);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "INSERT INTO entries (remote_id, unique_key, table_id, scope_id, last_modified)
           VALUES (?1, ?2, ?3, ?4, ?5)
           ON CONFLICT (remote_id, table_id, scope_id) DO NOTHING",
          rusqlite::params![
            entry.remote_id,
            entry.unique_key,
            entry.table_id,
            entry.scope_id,
            last_modified,
          ],
        )?)
      })
      .await?;
    Ok(changed > 0)
  }

  async fn find_entry_location<'a>(
    &'a self,
    table_name: &'a str,
    remote_id:  &'a str,
  ) -> Result<Option<EntryLocation>> {
    let table_name = table_name.to_owned();
    let remote_id  = remote_id.to_owned();

    let location = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT e.unique_key, s.name
             FROM entries e
             JOIN remote_tables t ON t.id = e.table_id
             JOIN scopes s        ON s.id = e.scope_id
             WHERE e.remote_id = ?1 AND t.name = ?2
             ORDER BY e.id
             LIMIT 1",
            rusqlite::params![remote_id, table_name],
            |row| {
              Ok(EntryLocation {
                unique_key: row.get(0)?,
                scope_name: row.get(1)?,
              })
            },
          )
          .optional()?)
      })
      .await?;
    Ok(location)
  }

  async fn list_entries(&self) -> Result<Vec<EntryListing>> {
    let raws: Vec<RawEntry> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!("{ENTRY_COLUMNS} ORDER BY e.id"))?;
        let rows = stmt
          .query_map([], RawEntry::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEntry::into_listing).collect()
  }

  async fn forget_entry<'a>(&'a self, table_name: &'a str, remote_id: &'a str) -> Result<usize> {
    let table_name = table_name.to_owned();
    let remote_id  = remote_id.to_owned();

    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM entries
           WHERE remote_id = ?1
             AND table_id IN (SELECT id FROM remote_tables WHERE name = ?2)",
          rusqlite::params![remote_id, table_name],
        )?)
      })
      .await?;
    Ok(removed)
  }

  // ── Update sets ───────────────────────────────────────────────────────────

  async fn insert_update_set(&self, update_set: NewUpdateSet) -> Result<bool> {
    let inserted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let changed = tx.execute(
          "INSERT INTO update_sets (remote_id, name, scope_id) VALUES (?1, ?2, ?3)
           ON CONFLICT (remote_id) DO NOTHING",
          rusqlite::params![update_set.remote_id, update_set.name, update_set.scope_id],
        )?;

        if update_set.is_current {
          let id: Option<i64> = tx
            .query_row(
              "SELECT id FROM update_sets WHERE remote_id = ?1 AND scope_id = ?2",
              rusqlite::params![update_set.remote_id, update_set.scope_id],
              |r| r.get(0),
            )
            .optional()?;
          if let Some(id) = id {
            tx.execute(
              "UPDATE scopes SET current_update_set = ?1 WHERE id = ?2",
              rusqlite::params![id, update_set.scope_id],
            )?;
          }
        }

        tx.commit()?;
        Ok(changed > 0)
      })
      .await?;
    Ok(inserted)
  }

  async fn find_update_set<'a>(&'a self, remote_id: &'a str) -> Result<Option<UpdateSet>> {
    let remote_id = remote_id.to_owned();

    let update_set = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("{UPDATE_SET_COLUMNS} WHERE u.remote_id = ?1"),
            rusqlite::params![remote_id],
            update_set_from_row,
          )
          .optional()?)
      })
      .await?;
    Ok(update_set)
  }

  async fn list_update_sets(&self, scope_id: LocalId) -> Result<Vec<UpdateSet>> {
    let update_sets = self
      .conn
      .call(move |conn| {
        let mut stmt =
          conn.prepare(&format!("{UPDATE_SET_COLUMNS} WHERE u.scope_id = ?1 ORDER BY u.id"))?;
        let rows = stmt
          .query_map(rusqlite::params![scope_id], update_set_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(update_sets)
  }

  async fn update_sets_cached_for(&self, scope_id: LocalId) -> Result<bool> {
    let cached = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT 1 FROM update_sets WHERE scope_id = ?1 LIMIT 1",
            rusqlite::params![scope_id],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false))
      })
      .await?;
    Ok(cached)
  }

  async fn mark_current_update_set(
    &self,
    scope_id:      LocalId,
    update_set_id: LocalId,
  ) -> Result<bool> {
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE scopes SET current_update_set = ?2
           WHERE id = ?1
             AND EXISTS (SELECT 1 FROM update_sets WHERE id = ?2 AND scope_id = ?1)",
          rusqlite::params![scope_id, update_set_id],
        )?)
      })
      .await?;
    Ok(changed > 0)
  }

  async fn truncate_update_sets(&self) -> Result<usize> {
    let removed = self
      .conn
      .call(|conn| {
        let tx = conn.transaction()?;
        tx.execute("UPDATE scopes SET current_update_set = NULL", [])?;
        let removed = tx.execute("DELETE FROM update_sets", [])?;
        tx.commit()?;
        Ok(removed)
      })
      .await?;

    tracing::debug!(removed, "truncated cached update sets");
    Ok(removed)
  }
}
