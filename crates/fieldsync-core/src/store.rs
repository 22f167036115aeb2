//! The `CacheStore` trait.
//!
//! The trait is implemented by storage backends (e.g.
//! `fieldsync-store-sqlite`). The synchronization layer depends on this
//! abstraction, not on any concrete backend.

use std::future::Future;

use crate::model::{
  EntryListing, EntryLocation, LocalId, NewEntry, NewUpdateSet, Scope, Table, UpdateSet,
};

/// Errors a [`CacheStore`] backend can report.
///
/// Resolvers need to tell a lost insert race (the row is already there) apart
/// from a real storage failure.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  /// `true` when an insert was rejected because the row's unique key is
  /// already present.
  fn is_duplicate_key(&self) -> bool;
}

/// Abstraction over the local metadata cache.
///
/// Lookups return `Ok(None)` / `Ok(false)` for "no such row"; `Err` is
/// reserved for storage failures.
pub trait CacheStore: Send + Sync {
  type Error: StoreError;

  // ── Scopes ────────────────────────────────────────────────────────────

  /// Look a scope up by its remote id.
  fn find_scope_by_remote_id<'a>(
    &'a self,
    remote_id: &'a str,
  ) -> impl Future<Output = Result<Option<Scope>, Self::Error>> + Send + 'a;

  /// Look a scope up by its name.
  fn find_scope_by_name<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Option<Scope>, Self::Error>> + Send + 'a;

  /// Insert a scope. Fails with a duplicate-key error if `remote_id` is
  /// already cached.
  fn insert_scope<'a>(
    &'a self,
    remote_id: &'a str,
    name: &'a str,
  ) -> impl Future<Output = Result<Scope, Self::Error>> + Send + 'a;

  /// All cached scopes, in insertion order.
  fn list_scopes(&self) -> impl Future<Output = Result<Vec<Scope>, Self::Error>> + Send + '_;

  /// Drop a scope together with its update sets, its tables and every entry
  /// that lives in it or in one of its tables. Returns `false` if no scope
  /// has that name.
  fn forget_scope<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  // ── Tables ────────────────────────────────────────────────────────────

  /// Look a table up by name.
  fn find_table_by_name<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Option<Table>, Self::Error>> + Send + 'a;

  /// Insert a table owned by an already-cached scope. Fails with a
  /// duplicate-key error if `name` is already cached.
  fn insert_table<'a>(
    &'a self,
    remote_id: &'a str,
    name: &'a str,
    scope_id: LocalId,
  ) -> impl Future<Output = Result<Table, Self::Error>> + Send + 'a;

  /// All cached tables, in insertion order.
  fn list_tables(&self) -> impl Future<Output = Result<Vec<Table>, Self::Error>> + Send + '_;

  /// Drop a table and its entries. Returns `false` if it was not cached.
  fn forget_table<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  // ── Entries ───────────────────────────────────────────────────────────

  /// Whether an entry exists for the (table, remote id, scope) triple.
  fn entry_exists<'a>(
    &'a self,
    table_id: LocalId,
    remote_id: &'a str,
    scope_id: LocalId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Insert an entry. A no-op when the triple is already cached; returns
  /// whether a row was written.
  fn insert_entry(
    &self,
    entry: NewEntry,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// The unique key and scope name of the entry `remote_id` in table
  /// `table_name`.
  fn find_entry_location<'a>(
    &'a self,
    table_name: &'a str,
    remote_id: &'a str,
  ) -> impl Future<Output = Result<Option<EntryLocation>, Self::Error>> + Send + 'a;

  /// All cached entries with their table and scope names.
  fn list_entries(
    &self,
  ) -> impl Future<Output = Result<Vec<EntryListing>, Self::Error>> + Send + '_;

  /// Drop the entry `remote_id` of table `table_name`. Returns the number of
  /// rows removed (one per scope it was cached under).
  fn forget_entry<'a>(
    &'a self,
    table_name: &'a str,
    remote_id: &'a str,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + 'a;

  // ── Update sets ───────────────────────────────────────────────────────

  /// Insert an update set. A no-op when `remote_id` is already cached; when
  /// `is_current` is set the owning scope's current pointer moves to it
  /// either way. Returns whether a row was written.
  fn insert_update_set(
    &self,
    update_set: NewUpdateSet,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Look an update set up by its remote id.
  fn find_update_set<'a>(
    &'a self,
    remote_id: &'a str,
  ) -> impl Future<Output = Result<Option<UpdateSet>, Self::Error>> + Send + 'a;

  /// The cached update sets of a scope, in insertion order. At most one of
  /// them has `is_current` set.
  fn list_update_sets(
    &self,
    scope_id: LocalId,
  ) -> impl Future<Output = Result<Vec<UpdateSet>, Self::Error>> + Send + '_;

  /// Whether any update set is cached for the scope.
  fn update_sets_cached_for(
    &self,
    scope_id: LocalId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Point the scope's current update set at `update_set_id`. Returns
  /// `false`, leaving the pointer alone, if that update set does not belong
  /// to the scope.
  fn mark_current_update_set(
    &self,
    scope_id: LocalId,
    update_set_id: LocalId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Delete every cached update set. Returns the number of rows removed.
  fn truncate_update_sets(&self) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;
}
