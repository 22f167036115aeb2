//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::Utc;
use fieldsync_core::{
  model::{NewEntry, NewUpdateSet, Scope, Table},
  store::{CacheStore, StoreError},
};

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn rid(c: char) -> String { c.to_string().repeat(32) }

/// A cached scope plus a table inside it.
async fn scope_and_table(s: &SqliteStore) -> (Scope, Table) {
  let scope = s.insert_scope(&rid('s'), "x_app").await.unwrap();
  let table = s
    .insert_table(&rid('t'), "sys_script_include", scope.id)
    .await
    .unwrap();
  (scope, table)
}

fn new_entry(remote_id: &str, unique_key: &str, table: &Table, scope: &Scope) -> NewEntry {
  NewEntry {
    remote_id:     remote_id.into(),
    unique_key:    unique_key.into(),
    table_id:      table.id,
    scope_id:      scope.id,
    last_modified: Utc::now(),
  }
}

fn new_update_set(remote_id: &str, name: &str, scope: &Scope, is_current: bool) -> NewUpdateSet {
  NewUpdateSet {
    remote_id: remote_id.into(),
    name: name.into(),
    scope_id: scope.id,
    is_current,
  }
}

// ─── Schema ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn schema_is_created_once_and_survives_reopen() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("cache.db");

  {
    let s = SqliteStore::open(&path).await.unwrap();
    assert_eq!(s.schema_version().await.unwrap(), 1);
    s.insert_scope("global", "global").await.unwrap();
  }

  let s = SqliteStore::open(&path).await.unwrap();
  assert_eq!(s.schema_version().await.unwrap(), 1);
  let scope = s.find_scope_by_remote_id("global").await.unwrap();
  assert_eq!(scope.map(|sc| sc.name), Some("global".to_string()));
}

#[tokio::test]
async fn foreign_keys_are_enforced() {
  let s = store().await;
  let err = s
    .insert_table(&rid('t'), "incident", 999)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Database(_)));
  assert!(!err.is_duplicate_key());
}

// ─── Scopes ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_and_find_scope() {
  let s = store().await;
  let scope = s.insert_scope(&rid('a'), "x_app").await.unwrap();

  let by_remote = s.find_scope_by_remote_id(&rid('a')).await.unwrap();
  assert_eq!(by_remote.as_ref(), Some(&scope));

  let by_name = s.find_scope_by_name("x_app").await.unwrap();
  assert_eq!(by_name, Some(scope));
}

#[tokio::test]
async fn missing_scope_is_none_not_error() {
  let s = store().await;
  assert!(s.find_scope_by_remote_id(&rid('z')).await.unwrap().is_none());
  assert!(s.find_scope_by_name("nope").await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_scope_insert_fails_and_keeps_one_row() {
  let s = store().await;
  s.insert_scope(&rid('a'), "first").await.unwrap();

  let err = s.insert_scope(&rid('a'), "second").await.unwrap_err();
  assert!(err.is_duplicate_key());

  let scopes = s.list_scopes().await.unwrap();
  assert_eq!(scopes.len(), 1);
  assert_eq!(scopes[0].name, "first");
}

// ─── Tables ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_and_find_table() {
  let s = store().await;
  let (scope, table) = scope_and_table(&s).await;

  let found = s.find_table_by_name("sys_script_include").await.unwrap().unwrap();
  assert_eq!(found, table);
  assert_eq!(found.scope_id, scope.id);
  assert!(s.find_table_by_name("incident").await.unwrap().is_none());
}

#[tokio::test]
async fn table_names_are_unique() {
  let s = store().await;
  let (scope, _) = scope_and_table(&s).await;

  let err = s
    .insert_table(&rid('u'), "sys_script_include", scope.id)
    .await
    .unwrap_err();
  assert!(err.is_duplicate_key());
  assert_eq!(s.list_tables().await.unwrap().len(), 1);
}

// ─── Entries ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_entry_is_idempotent_per_triple() {
  let s = store().await;
  let (scope, table) = scope_and_table(&s).await;
  let entry_id = rid('e');

  assert!(!s.entry_exists(table.id, &entry_id, scope.id).await.unwrap());
  assert!(s.insert_entry(new_entry(&entry_id, "MyUtil", &table, &scope)).await.unwrap());
  assert!(s.entry_exists(table.id, &entry_id, scope.id).await.unwrap());

  // Same triple again: no-op, still success.
  assert!(!s.insert_entry(new_entry(&entry_id, "Renamed", &table, &scope)).await.unwrap());

  let entries = s.list_entries().await.unwrap();
  assert_eq!(entries.len(), 1);
  assert_eq!(entries[0].entry.unique_key, "MyUtil");
  assert_eq!(entries[0].table_name, "sys_script_include");
  assert_eq!(entries[0].scope_name, "x_app");
}

#[tokio::test]
async fn same_record_in_another_scope_is_a_separate_entry() {
  let s = store().await;
  let (scope, table) = scope_and_table(&s).await;
  let global = s.insert_scope("global", "global").await.unwrap();
  let entry_id = rid('e');

  s.insert_entry(new_entry(&entry_id, "MyUtil", &table, &scope)).await.unwrap();
  s.insert_entry(new_entry(&entry_id, "MyUtil", &table, &global)).await.unwrap();

  assert_eq!(s.list_entries().await.unwrap().len(), 2);
}

#[tokio::test]
async fn empty_unique_key_is_rejected() {
  let s = store().await;
  let (scope, table) = scope_and_table(&s).await;

  let err = s
    .insert_entry(new_entry(&rid('e'), "", &table, &scope))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::EmptyUniqueKey(_)));
}

#[tokio::test]
async fn entry_location_joins_table_and_scope() {
  let s = store().await;
  let (scope, table) = scope_and_table(&s).await;
  s.insert_entry(new_entry(&rid('e'), "MyUtil", &table, &scope)).await.unwrap();

  let location = s
    .find_entry_location("sys_script_include", &rid('e'))
    .await
    .unwrap()
    .unwrap();
  assert_eq!(location.unique_key, "MyUtil");
  assert_eq!(location.scope_name, "x_app");

  assert!(s.find_entry_location("incident", &rid('e')).await.unwrap().is_none());
  assert!(s
    .find_entry_location("sys_script_include", &rid('f'))
    .await
    .unwrap()
    .is_none());
}

// ─── Update sets ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn update_sets_insert_list_and_current_flag() {
  let s = store().await;
  let (scope, _) = scope_and_table(&s).await;

  assert!(!s.update_sets_cached_for(scope.id).await.unwrap());

  s.insert_update_set(new_update_set(&rid('1'), "Default", &scope, false)).await.unwrap();
  s.insert_update_set(new_update_set(&rid('2'), "Feature", &scope, true)).await.unwrap();

  assert!(s.update_sets_cached_for(scope.id).await.unwrap());

  let sets = s.list_update_sets(scope.id).await.unwrap();
  assert_eq!(sets.len(), 2);
  assert_eq!(sets.iter().filter(|u| u.is_current).count(), 1);
  assert!(sets.iter().find(|u| u.name == "Feature").unwrap().is_current);
}

#[tokio::test]
async fn at_most_one_current_update_set_per_scope() {
  let s = store().await;
  let (scope, _) = scope_and_table(&s).await;

  s.insert_update_set(new_update_set(&rid('1'), "A", &scope, true)).await.unwrap();
  s.insert_update_set(new_update_set(&rid('2'), "B", &scope, true)).await.unwrap();

  let sets = s.list_update_sets(scope.id).await.unwrap();
  let current: Vec<_> = sets.iter().filter(|u| u.is_current).collect();
  assert_eq!(current.len(), 1);
  assert_eq!(current[0].name, "B");
}

#[tokio::test]
async fn duplicate_update_set_is_a_no_op() {
  let s = store().await;
  let (scope, _) = scope_and_table(&s).await;

  assert!(s.insert_update_set(new_update_set(&rid('1'), "A", &scope, false)).await.unwrap());
  assert!(!s.insert_update_set(new_update_set(&rid('1'), "A2", &scope, false)).await.unwrap());

  let sets = s.list_update_sets(scope.id).await.unwrap();
  assert_eq!(sets.len(), 1);
  assert_eq!(sets[0].name, "A");
}

#[tokio::test]
async fn find_update_set_and_mark_current() {
  let s = store().await;
  let (scope, _) = scope_and_table(&s).await;
  let other = s.insert_scope(&rid('o'), "x_other").await.unwrap();

  s.insert_update_set(new_update_set(&rid('1'), "A", &scope, true)).await.unwrap();
  s.insert_update_set(new_update_set(&rid('2'), "B", &scope, false)).await.unwrap();
  s.insert_update_set(new_update_set(&rid('3'), "C", &other, false)).await.unwrap();

  let b = s.find_update_set(&rid('2')).await.unwrap().unwrap();
  assert!(!b.is_current);
  assert!(s.mark_current_update_set(scope.id, b.id).await.unwrap());
  assert!(s.find_update_set(&rid('2')).await.unwrap().unwrap().is_current);
  assert!(!s.find_update_set(&rid('1')).await.unwrap().unwrap().is_current);

  // An update set of another scope cannot become this scope's current one.
  let c = s.find_update_set(&rid('3')).await.unwrap().unwrap();
  assert!(!s.mark_current_update_set(scope.id, c.id).await.unwrap());
  assert!(s.find_update_set(&rid('2')).await.unwrap().unwrap().is_current);

  assert!(s.find_update_set(&rid('9')).await.unwrap().is_none());
}

#[tokio::test]
async fn truncate_clears_update_sets_and_current_pointer() {
  let s = store().await;
  let (scope, _) = scope_and_table(&s).await;
  s.insert_update_set(new_update_set(&rid('1'), "A", &scope, true)).await.unwrap();
  s.insert_update_set(new_update_set(&rid('2'), "B", &scope, false)).await.unwrap();

  assert_eq!(s.truncate_update_sets().await.unwrap(), 2);
  assert!(!s.update_sets_cached_for(scope.id).await.unwrap());

  // Re-inserting after truncation starts from a clean pointer.
  s.insert_update_set(new_update_set(&rid('2'), "B", &scope, false)).await.unwrap();
  let sets = s.list_update_sets(scope.id).await.unwrap();
  assert!(sets.iter().all(|u| !u.is_current));

  // Scopes, tables and entries are untouched.
  assert_eq!(s.list_scopes().await.unwrap().len(), 1);
  assert_eq!(s.list_tables().await.unwrap().len(), 1);
}

// ─── Invalidation ────────────────────────────────────────────────────────────

#[tokio::test]
async fn forget_entry_removes_only_that_record() {
  let s = store().await;
  let (scope, table) = scope_and_table(&s).await;
  s.insert_entry(new_entry(&rid('e'), "One", &table, &scope)).await.unwrap();
  s.insert_entry(new_entry(&rid('f'), "Two", &table, &scope)).await.unwrap();

  assert_eq!(s.forget_entry("sys_script_include", &rid('e')).await.unwrap(), 1);
  assert_eq!(s.forget_entry("sys_script_include", &rid('e')).await.unwrap(), 0);

  let entries = s.list_entries().await.unwrap();
  assert_eq!(entries.len(), 1);
  assert_eq!(entries[0].entry.remote_id, rid('f'));
}

#[tokio::test]
async fn forget_table_drops_its_entries() {
  let s = store().await;
  let (scope, table) = scope_and_table(&s).await;
  s.insert_entry(new_entry(&rid('e'), "One", &table, &scope)).await.unwrap();

  assert!(s.forget_table("sys_script_include").await.unwrap());
  assert!(!s.forget_table("sys_script_include").await.unwrap());
  assert!(s.find_table_by_name("sys_script_include").await.unwrap().is_none());
  assert!(s.list_entries().await.unwrap().is_empty());
  // The scope stays cached.
  assert!(s.find_scope_by_name("x_app").await.unwrap().is_some());
}

#[tokio::test]
async fn forget_scope_cascades_to_dependents() {
  let s = store().await;
  let (scope, table) = scope_and_table(&s).await;
  let global = s.insert_scope("global", "global").await.unwrap();
  let global_table = s.insert_table(&rid('g'), "incident", global.id).await.unwrap();

  // One entry in the forgotten scope's table, one in the forgotten scope
  // through a global table, one fully global.
  s.insert_entry(new_entry(&rid('1'), "A", &table, &global)).await.unwrap();
  s.insert_entry(new_entry(&rid('2'), "B", &global_table, &scope)).await.unwrap();
  s.insert_entry(new_entry(&rid('3'), "C", &global_table, &global)).await.unwrap();
  s.insert_update_set(new_update_set(&rid('u'), "Default", &scope, true)).await.unwrap();

  assert!(s.forget_scope("x_app").await.unwrap());

  assert!(s.find_scope_by_name("x_app").await.unwrap().is_none());
  assert!(s.find_table_by_name("sys_script_include").await.unwrap().is_none());
  assert!(s.find_update_set(&rid('u')).await.unwrap().is_none());

  let entries = s.list_entries().await.unwrap();
  assert_eq!(entries.len(), 1);
  assert_eq!(entries[0].entry.remote_id, rid('3'));

  assert!(!s.forget_scope("x_app").await.unwrap());
}
