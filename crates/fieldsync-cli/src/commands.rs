//! Command dispatch and output.

use std::collections::HashMap;

use anyhow::{Context as _, Result};
use fieldsync_core::{remote::RemoteClient, store::CacheStore};
use fieldsync_sync::Transfer;

use crate::{Command, ForgetCommand, UpdateSetCommand};

pub async fn run<S, R>(command: Command, transfer: &Transfer<S, R>) -> Result<()>
where
  S: CacheStore,
  R: RemoteClient,
{
  let sync = transfer.sync();

  match command {
    Command::Download { table, sys_id } => {
      let report = transfer
        .download(&table, &sys_id)
        .await
        .with_context(|| format!("download of {table}/{sys_id} failed"))?;
      let state = if report.created { "new" } else { "known" };
      println!(
        "{table}/{sys_id} ({state} entry, scope {}, key {})",
        report.scope_name, report.unique_key
      );
      for file in &report.files {
        println!("  {}", file.display());
      }
    }

    Command::Upload { table, sys_id, fields, update_set } => {
      let report = transfer
        .upload(&table, &sys_id, &fields, update_set.as_deref())
        .await
        .with_context(|| format!("upload of {table}/{sys_id} failed"))?;
      println!(
        "{table}/{sys_id}: uploaded {} (scope {})",
        report.fields.join(", "),
        report.scope_name
      );
      if let Some(update_set) = report.update_set {
        println!("  recorded in update set {update_set}");
      }
    }

    Command::Search { table, query, fields, limit } => {
      let value = transfer
        .search(&table, &query, &fields, limit)
        .await
        .with_context(|| format!("search of {table} failed"))?;
      println!("{}", serde_json::to_string_pretty(&value)?);
    }

    Command::UpdateSet(UpdateSetCommand::List { scope }) => {
      let update_sets = sync
        .list_or_fetch_update_sets(&scope)
        .await
        .with_context(|| format!("listing update sets of scope {scope} failed"))?;
      for u in update_sets {
        let marker = if u.is_current { "*" } else { " " };
        println!("{marker} {}  {}", u.remote_id, u.name);
      }
    }

    Command::UpdateSet(UpdateSetCommand::Set { scope, update_set }) => {
      let selected = sync
        .set_update_set(&scope, &update_set)
        .await
        .with_context(|| format!("selecting update set {update_set} in scope {scope} failed"))?;
      println!("{scope}: current update set is now {}", selected.name);
    }

    Command::UpdateSet(UpdateSetCommand::Truncate) => {
      let removed = sync
        .truncate_update_sets()
        .await
        .context("truncating update sets failed")?;
      println!("removed {removed} cached update sets");
    }

    Command::Forget(ForgetCommand::Entry { table, sys_id }) => {
      sync
        .forget_entry(&table, &sys_id)
        .await
        .with_context(|| format!("forgetting entry {table}/{sys_id} failed"))?;
      println!("forgot entry {table}/{sys_id}");
    }

    Command::Forget(ForgetCommand::Table { name }) => {
      sync
        .forget_table(&name)
        .await
        .with_context(|| format!("forgetting table {name} failed"))?;
      println!("forgot table {name}");
    }

    Command::Forget(ForgetCommand::Scope { name }) => {
      sync
        .forget_scope(&name)
        .await
        .with_context(|| format!("forgetting scope {name} failed"))?;
      println!("forgot scope {name}");
    }

    Command::Cache => print_cache(sync.store()).await?,
  }

  Ok(())
}

async fn print_cache<S: CacheStore>(store: &S) -> Result<()> {
  let scopes = store.list_scopes().await.context("listing scopes failed")?;
  let tables = store.list_tables().await.context("listing tables failed")?;
  let entries = store.list_entries().await.context("listing entries failed")?;

  let scope_names: HashMap<_, _> = scopes.iter().map(|s| (s.id, s.name.as_str())).collect();

  println!("scopes ({}):", scopes.len());
  for s in &scopes {
    println!("  {}  {}", s.remote_id, s.name);
  }

  println!("tables ({}):", tables.len());
  for t in &tables {
    let scope = scope_names.get(&t.scope_id).copied().unwrap_or("?");
    println!("  {}  {} [{scope}]", t.remote_id, t.name);
  }

  println!("entries ({}):", entries.len());
  for e in &entries {
    println!(
      "  {}  {}/{} [{}] {}",
      e.entry.remote_id,
      e.table_name,
      e.entry.unique_key,
      e.scope_name,
      e.entry.last_modified.to_rfc3339()
    );
  }
  Ok(())
}
