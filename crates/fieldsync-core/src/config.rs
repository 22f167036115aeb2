//! Table and field configuration.
//!
//! Each synced table names the field whose value becomes the entry's folder
//! name (`unique_key`) and the fields that are projected to files, each with
//! the file extension to use.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Fields every record download asks for on top of the configured ones.
pub const ENFORCED_FIELDS: [&str; 2] = ["sys_id", "sys_scope.sys_id"];

/// One field projected to a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldConfig {
  pub field:     String,
  pub extension: String,
}

/// One synced table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
  pub name:       String,
  #[serde(default)]
  pub unique_key: String,
  #[serde(default)]
  pub fields:     Vec<FieldConfig>,
}

impl TableConfig {
  /// Configured field names, in configuration order.
  pub fn field_names(&self) -> Vec<&str> {
    self.fields.iter().map(|f| f.field.as_str()).collect()
  }

  pub fn field(&self, name: &str) -> Option<&FieldConfig> {
    self.fields.iter().find(|f| f.field == name)
  }

  /// Look up a field, failing with [`Error::UnknownField`].
  pub fn require_field(&self, name: &str) -> Result<&FieldConfig> {
    self.field(name).ok_or_else(|| Error::UnknownField {
      table: self.name.clone(),
      field: name.to_owned(),
    })
  }

  /// The fields to request when downloading a record: the configured ones,
  /// the unique key, and [`ENFORCED_FIELDS`], without duplicates.
  pub fn download_fields(&self) -> Vec<String> {
    let mut fields: Vec<String> = self.field_names().into_iter().map(str::to_owned).collect();
    for extra in std::iter::once(self.unique_key.as_str()).chain(ENFORCED_FIELDS) {
      if !fields.iter().any(|f| f == extra) {
        fields.push(extra.to_owned());
      }
    }
    fields
  }

  fn validate(&self) -> Result<()> {
    if self.unique_key.trim().is_empty() {
      return Err(Error::MissingUniqueKey(self.name.clone()));
    }

    let mut seen = HashSet::new();
    for field in &self.fields {
      if field.field.trim().is_empty() {
        return Err(Error::MissingFieldName(self.name.clone()));
      }
      if field.extension.trim().is_empty() {
        return Err(Error::MissingExtension {
          table: self.name.clone(),
          field: field.field.clone(),
        });
      }
      if !seen.insert(field.field.as_str()) {
        return Err(Error::DuplicateField {
          table: self.name.clone(),
          field: field.field.clone(),
        });
      }
    }
    Ok(())
  }
}

/// The full set of synced tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TablesConfig(Vec<TableConfig>);

impl TablesConfig {
  /// Build and validate a table set.
  pub fn new(tables: Vec<TableConfig>) -> Result<Self> {
    let config = Self(tables);
    config.validate()?;
    Ok(config)
  }

  /// Check every table declares a unique key and every field an extension.
  pub fn validate(&self) -> Result<()> {
    let mut seen = HashSet::new();
    for table in &self.0 {
      if !seen.insert(table.name.as_str()) {
        return Err(Error::DuplicateTable(table.name.clone()));
      }
      table.validate()?;
    }
    Ok(())
  }

  pub fn get(&self, name: &str) -> Option<&TableConfig> {
    self.0.iter().find(|t| t.name == name)
  }

  /// Look up a table, failing with [`Error::UnknownTable`].
  pub fn require(&self, name: &str) -> Result<&TableConfig> {
    self.get(name).ok_or_else(|| Error::UnknownTable(name.to_owned()))
  }

  pub fn iter(&self) -> impl Iterator<Item = &TableConfig> { self.0.iter() }
}
