//! Moving record fields between the remote platform and the filesystem.

use std::path::PathBuf;

use fieldsync_core::{
  GLOBAL_SCOPE,
  config::{ENFORCED_FIELDS, TablesConfig},
  is_remote_id,
  model::EntityKind,
  remote::RemoteClient,
  store::CacheStore,
};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::{
  Error, Result,
  projection::Projection,
  sync::Synchronizer,
  wire::{self, RecordEnvelope},
};

/// Outcome of [`Transfer::download`].
#[derive(Debug, Clone)]
pub struct DownloadReport {
  pub table:      String,
  pub remote_id:  String,
  pub scope_name: String,
  pub unique_key: String,
  /// `false` when the entry had been downloaded before.
  pub created:    bool,
  pub files:      Vec<PathBuf>,
}

/// Outcome of [`Transfer::upload`].
#[derive(Debug, Clone)]
pub struct UploadReport {
  pub table:      String,
  pub remote_id:  String,
  pub scope_name: String,
  pub fields:     Vec<String>,
  pub update_set: Option<String>,
}

/// Download, upload and search on top of a [`Synchronizer`], driven by the
/// table configuration.
pub struct Transfer<S, R> {
  sync:       Synchronizer<S, R>,
  tables:     TablesConfig,
  projection: Projection,
}

fn require_remote_id(kind: EntityKind, id: &str) -> Result<()> {
  if is_remote_id(id) {
    Ok(())
  } else {
    Err(Error::InvalidId { kind, id: id.to_owned() })
  }
}

impl<S: CacheStore, R: RemoteClient> Transfer<S, R> {
  pub fn new(sync: Synchronizer<S, R>, tables: TablesConfig, projection: Projection) -> Self {
    Self { sync, tables, projection }
  }

  pub fn sync(&self) -> &Synchronizer<S, R> { &self.sync }

  pub fn tables(&self) -> &TablesConfig { &self.tables }

  pub fn projection(&self) -> &Projection { &self.projection }

  /// Fetch the record `remote_id` of `table`, cache it as an entry and write
  /// each configured field into its file.
  pub async fn download(&self, table: &str, remote_id: &str) -> Result<DownloadReport> {
    require_remote_id(EntityKind::Entry, remote_id)?;
    let config = self.tables.require(table)?;

    let url = self
      .sync
      .endpoints()
      .record(table, remote_id, &config.download_fields())?;
    let body = self.sync.remote().get(&url).await?;
    let record: RecordEnvelope = wire::decode("record", &body)?;

    let unique_key = record.string_field(&config.unique_key)?;
    let scope_remote_id = record
      .optional_string_field("sys_scope.sys_id")?
      .unwrap_or(GLOBAL_SCOPE);

    let written = self
      .sync
      .write_entry(table, unique_key, remote_id, scope_remote_id)
      .await?;

    // An entry downloaded earlier keeps the directory it was first given.
    let location = self
      .sync
      .store()
      .find_entry_location(table, remote_id)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::not_found(EntityKind::Entry, format!("{table}/{remote_id}")))?;

    let mut files = Vec::with_capacity(config.fields.len());
    for field in &config.fields {
      let content = record.optional_string_field(&field.field)?.unwrap_or_default();
      if content.is_empty() {
        debug!(table = %table, field = %field.field, "field is empty");
      }
      let path = self
        .projection
        .write_field(
          table,
          &location.scope_name,
          &location.unique_key,
          &field.field,
          &field.extension,
          content.as_bytes(),
        )
        .await?;
      files.push(path);
    }

    info!(
      table = %table,
      remote_id = %remote_id,
      scope = %location.scope_name,
      files = files.len(),
      "downloaded"
    );
    Ok(DownloadReport {
      table: table.to_owned(),
      remote_id: remote_id.to_owned(),
      scope_name: location.scope_name,
      unique_key: location.unique_key,
      created: written.created,
      files,
    })
  }

  /// Send the local content of `fields` back to the record `remote_id` of
  /// `table`, optionally recorded in `update_set`.
  ///
  /// The entry must have been downloaded before; nothing is sent otherwise.
  pub async fn upload(
    &self,
    table: &str,
    remote_id: &str,
    fields: &[String],
    update_set: Option<&str>,
  ) -> Result<UploadReport> {
    require_remote_id(EntityKind::Entry, remote_id)?;
    if let Some(update_set) = update_set {
      require_remote_id(EntityKind::UpdateSet, update_set)?;
    }
    if fields.is_empty() {
      return Err(Error::InvalidArgument("no fields to upload".into()));
    }

    let config = self.tables.require(table)?;
    let field_configs = fields
      .iter()
      .map(|f| config.require_field(f))
      .collect::<fieldsync_core::Result<Vec<_>>>()?;

    let location = self
      .sync
      .store()
      .find_entry_location(table, remote_id)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::not_found(EntityKind::Entry, format!("{table}/{remote_id}")))?;

    let mut payload = Map::new();
    for field in field_configs {
      let path = self.projection.path_for(
        table,
        &location.scope_name,
        &location.unique_key,
        &field.field,
        &field.extension,
      )?;
      let bytes = self.projection.read_field(&path).await?;
      let content = String::from_utf8(bytes).map_err(|_| {
        Error::InvalidArgument(format!("{} is not valid UTF-8", path.display()))
      })?;
      payload.insert(field.field.clone(), Value::String(content));
    }

    let url = self.sync.endpoints().record_update(
      table,
      remote_id,
      fields,
      &location.scope_name,
      update_set,
    )?;
    let body = serde_json::to_vec(&Value::Object(payload))?;
    self.sync.remote().put(&url, body).await?;

    info!(
      table = %table,
      remote_id = %remote_id,
      scope = %location.scope_name,
      fields = %fields.join(","),
      "uploaded"
    );
    Ok(UploadReport {
      table:      table.to_owned(),
      remote_id:  remote_id.to_owned(),
      scope_name: location.scope_name,
      fields:     fields.to_vec(),
      update_set: update_set.map(str::to_owned),
    })
  }

  /// Query `table` with an encoded query. The cache is not touched.
  ///
  /// Requests the table's download fields when it is configured (the enforced
  /// fields otherwise) plus `extra_fields`.
  pub async fn search(
    &self,
    table: &str,
    encoded_query: &str,
    extra_fields: &[String],
    limit: u32,
  ) -> Result<Value> {
    if limit == 0 {
      return Err(Error::InvalidArgument("search limit must be positive".into()));
    }

    let mut fields = match self.tables.get(table) {
      Some(config) => config.download_fields(),
      None => ENFORCED_FIELDS.iter().map(|f| (*f).to_owned()).collect(),
    };
    for extra in extra_fields {
      if !fields.contains(extra) {
        fields.push(extra.clone());
      }
    }

    let url = self.sync.endpoints().search(table, encoded_query, &fields, limit)?;
    let body = self.sync.remote().get(&url).await?;
    let value: Value = wire::decode("search", &body)?;
    debug!(table = %table, "search complete");
    Ok(value)
  }
}
