//! [`Synchronizer`]: reconciles the local cache against the remote platform.
//!
//! Every resolver follows the same shape: a cache hit wins outright; on a miss
//! the remote is queried, the result is inserted, and a duplicate-key failure
//! on that insert means another writer cached the row first, so the row is
//! re-read instead.

use chrono::Utc;
use fieldsync_core::{
  GLOBAL_SCOPE,
  model::{EntityKind, NewEntry, Scope, Table},
  remote::RemoteClient,
  store::{CacheStore, StoreError},
};
use tracing::{debug, info, warn};

use crate::{
  Error, Result,
  endpoints::Endpoints,
  projection::sanitize_key,
  wire::{self, ResultList, ScopeRow, TableRow},
};

/// What [`Synchronizer::write_entry`] resolved and whether it inserted a row.
#[derive(Debug, Clone)]
pub struct WrittenEntry {
  pub table:      Table,
  pub scope:      Scope,
  /// The sanitized unique key the entry was inserted with; `None` when it
  /// was already cached.
  pub unique_key: Option<String>,
  /// `false` when the entry was already cached.
  pub created:    bool,
}

/// The synchronization layer: one cache store, one remote client and the
/// endpoint builder for the remote instance.
pub struct Synchronizer<S, R> {
  store:     S,
  remote:    R,
  endpoints: Endpoints,
}

impl<S: CacheStore, R: RemoteClient> Synchronizer<S, R> {
  pub fn new(store: S, remote: R, endpoints: Endpoints) -> Self {
    Self { store, remote, endpoints }
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn remote(&self) -> &R { &self.remote }

  pub fn endpoints(&self) -> &Endpoints { &self.endpoints }

  // ── Scopes ────────────────────────────────────────────────────────────

  /// The scope with remote id `remote_id`, fetched and cached on a miss.
  ///
  /// `Ok(None)` when the remote knows no such scope; the caller decides the
  /// fallback.
  pub async fn resolve_scope(&self, remote_id: &str) -> Result<Option<Scope>> {
    if let Some(scope) = self
      .store
      .find_scope_by_remote_id(remote_id)
      .await
      .map_err(Error::store)?
    {
      debug!(remote_id = %remote_id, scope = %scope.name, "scope cache hit");
      return Ok(Some(scope));
    }

    debug!(remote_id = %remote_id, "scope cache miss");
    let rows = self.fetch_scopes(&self.endpoints.scope_by_id(remote_id)?).await?;

    let mut resolved = None;
    for row in rows {
      let scope = self.cache_scope(&row.sys_id, &row.scope).await?;
      if scope.remote_id == remote_id {
        resolved = Some(scope);
      }
    }
    if resolved.is_none() {
      debug!(remote_id = %remote_id, "remote has no such scope");
    }
    Ok(resolved)
  }

  /// The scope named `name`, fetched and cached on a miss. Unlike
  /// [`Self::resolve_scope`], an unknown name is [`Error::NotFound`].
  ///
  /// On a miss `name` is the remote scope identifier (`global`, `x_app`);
  /// the cached row for the matching remote id is returned whatever name it
  /// was cached under.
  pub async fn resolve_scope_by_name(&self, name: &str) -> Result<Scope> {
    if let Some(scope) = self.store.find_scope_by_name(name).await.map_err(Error::store)? {
      debug!(scope = %name, "scope cache hit");
      return Ok(scope);
    }

    debug!(scope = %name, "scope cache miss");
    let rows = self.fetch_scopes(&self.endpoints.scope_by_name(name)?).await?;

    // A scope first cached through a table carries its display name, so the
    // answer is matched on the identifier the remote was queried with.
    let single = rows.len() == 1;
    let mut resolved = None;
    for row in rows {
      let matches = single || row.scope == name;
      let scope = self.cache_scope(&row.sys_id, &row.scope).await?;
      if matches {
        resolved = Some(scope);
      }
    }
    resolved.ok_or_else(|| Error::not_found(EntityKind::Scope, name))
  }

  async fn fetch_scopes(&self, url: &str) -> Result<Vec<ScopeRow>> {
    let body = self.remote.get(url).await?;
    let rows: ResultList<ScopeRow> = wire::decode("sys_scope", &body)?;
    Ok(rows.result)
  }

  /// Insert a scope unless it is already cached, returning the cached row.
  async fn cache_scope(&self, remote_id: &str, name: &str) -> Result<Scope> {
    if let Some(scope) = self
      .store
      .find_scope_by_remote_id(remote_id)
      .await
      .map_err(Error::store)?
    {
      return Ok(scope);
    }

    match self.store.insert_scope(remote_id, name).await {
      Ok(scope) => {
        info!(remote_id = %remote_id, scope = %name, "cached scope");
        Ok(scope)
      }
      Err(e) if e.is_duplicate_key() => {
        debug!(remote_id = %remote_id, "scope cached concurrently, re-reading");
        self
          .store
          .find_scope_by_remote_id(remote_id)
          .await
          .map_err(Error::store)?
          .ok_or_else(|| Error::not_found(EntityKind::Scope, remote_id))
      }
      Err(e) => Err(Error::store(e)),
    }
  }

  /// The global scope, resolved remotely or created locally when the remote
  /// does not list it.
  async fn global_scope(&self) -> Result<Scope> {
    match self.resolve_scope(GLOBAL_SCOPE).await? {
      Some(scope) => Ok(scope),
      None => self.cache_scope(GLOBAL_SCOPE, GLOBAL_SCOPE).await,
    }
  }

  // ── Tables ────────────────────────────────────────────────────────────

  /// The table named `name`, fetched and cached (together with its scope) on
  /// a miss.
  pub async fn resolve_table(&self, name: &str) -> Result<Table> {
    if let Some(table) = self.store.find_table_by_name(name).await.map_err(Error::store)? {
      debug!(table = %name, "table cache hit");
      return Ok(table);
    }

    debug!(table = %name, "table cache miss");
    let body = self.remote.get(&self.endpoints.table_by_name(name)?).await?;
    let rows: ResultList<TableRow> = wire::decode("sys_db_object", &body)?;
    let row = rows
      .result
      .into_iter()
      .next()
      .ok_or_else(|| Error::not_found(EntityKind::Table, name))?;
    if row.name != name {
      warn!(table = %name, remote = %row.name, "remote answered with a different table");
      return Err(Error::InvalidResponse(format!(
        "asked for table {name:?}, got {:?}",
        row.name
      )));
    }

    let scope = self.cache_scope(&row.scope_sys_id, &row.scope_name).await?;

    match self.store.insert_table(&row.sys_id, name, scope.id).await {
      Ok(table) => {
        info!(table = %name, scope = %scope.name, "cached table");
        Ok(table)
      }
      Err(e) if e.is_duplicate_key() => {
        debug!(table = %name, "table cached concurrently, re-reading");
        self
          .store
          .find_table_by_name(name)
          .await
          .map_err(Error::store)?
          .ok_or_else(|| Error::not_found(EntityKind::Table, name))
      }
      Err(e) => Err(Error::store(e)),
    }
  }

  // ── Entries ───────────────────────────────────────────────────────────

  /// Record that the remote record `entry_remote_id` of `table_name` has been
  /// downloaded.
  ///
  /// A scope the remote does not know falls back to the global scope. Writing
  /// an entry that is already cached succeeds without touching the store, and
  /// without looking at `unique_key`.
  pub async fn write_entry(
    &self,
    table_name: &str,
    unique_key: &str,
    entry_remote_id: &str,
    scope_remote_id: &str,
  ) -> Result<WrittenEntry> {
    let table = self.resolve_table(table_name).await?;

    let scope = match self.resolve_scope(scope_remote_id).await? {
      Some(scope) => scope,
      None => {
        warn!(
          remote_id = %scope_remote_id,
          entry = %entry_remote_id,
          "unknown scope, falling back to global"
        );
        self.global_scope().await?
      }
    };

    let exists = self
      .store
      .entry_exists(table.id, entry_remote_id, scope.id)
      .await
      .map_err(Error::store)?;
    if exists {
      debug!(table = %table_name, remote_id = %entry_remote_id, "entry already cached");
      return Ok(WrittenEntry { table, scope, unique_key: None, created: false });
    }

    let key =
      sanitize_key(unique_key).ok_or_else(|| Error::InvalidUniqueKey(unique_key.to_owned()))?;
    let created = self
      .store
      .insert_entry(NewEntry {
        remote_id:     entry_remote_id.to_owned(),
        unique_key:    key.clone(),
        table_id:      table.id,
        scope_id:      scope.id,
        last_modified: Utc::now(),
      })
      .await
      .map_err(Error::store)?;
    if !created {
      debug!(table = %table_name, remote_id = %entry_remote_id, "entry cached concurrently");
      return Ok(WrittenEntry { table, scope, unique_key: None, created });
    }

    info!(
      table = %table_name,
      remote_id = %entry_remote_id,
      scope = %scope.name,
      unique_key = %key,
      "cached entry"
    );
    Ok(WrittenEntry { table, scope, unique_key: Some(key), created })
  }

  // ── Invalidation ──────────────────────────────────────────────────────

  /// Forget a cached entry. Returns the number of rows removed.
  pub async fn forget_entry(&self, table_name: &str, remote_id: &str) -> Result<usize> {
    let removed = self
      .store
      .forget_entry(table_name, remote_id)
      .await
      .map_err(Error::store)?;
    if removed == 0 {
      return Err(Error::not_found(EntityKind::Entry, format!("{table_name}/{remote_id}")));
    }
    info!(table = %table_name, remote_id = %remote_id, removed, "forgot entry");
    Ok(removed)
  }

  /// Forget a cached table and its entries.
  pub async fn forget_table(&self, name: &str) -> Result<()> {
    if !self.store.forget_table(name).await.map_err(Error::store)? {
      return Err(Error::not_found(EntityKind::Table, name));
    }
    info!(table = %name, "forgot table");
    Ok(())
  }

  /// Forget a cached scope and everything that belongs to it.
  pub async fn forget_scope(&self, name: &str) -> Result<()> {
    if !self.store.forget_scope(name).await.map_err(Error::store)? {
      return Err(Error::not_found(EntityKind::Scope, name));
    }
    info!(scope = %name, "forgot scope");
    Ok(())
  }
}
