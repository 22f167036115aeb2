//! Typed remote response bodies, one per endpoint.
//!
//! The table API returns dot-walked reference fields as flat keys
//! (`"sys_scope.sys_id"`), so those are renamed rather than nested.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::{Error, Result};

/// Decode `body` as `T`, labelling failures with `endpoint`.
pub fn decode<T: DeserializeOwned>(endpoint: &'static str, body: &[u8]) -> Result<T> {
  serde_json::from_slice(body).map_err(|source| Error::Decode { endpoint, source })
}

/// `{"result": [...]}`, the shape of every table API list query.
#[derive(Debug, Deserialize)]
pub struct ResultList<T> {
  pub result: Vec<T>,
}

/// A row of `sys_scope` queried with `sysparm_fields=scope,sys_id`.
#[derive(Debug, Clone, Deserialize)]
pub struct ScopeRow {
  pub scope:  String,
  pub sys_id: String,
}

/// A row of `sys_db_object` queried with
/// `sysparm_fields=sys_id,sys_scope.sys_id,sys_scope.name,name`.
#[derive(Debug, Clone, Deserialize)]
pub struct TableRow {
  pub sys_id:       String,
  pub name:         String,
  #[serde(rename = "sys_scope.sys_id")]
  pub scope_sys_id: String,
  #[serde(rename = "sys_scope.name")]
  pub scope_name:   String,
}

/// `{"result": {...}}`, a single record fetched by id.
#[derive(Debug, Deserialize)]
pub struct RecordEnvelope {
  pub result: Map<String, Value>,
}

impl RecordEnvelope {
  /// The string value of `field`, failing if it is missing or not a string.
  pub fn string_field(&self, field: &str) -> Result<&str> {
    match self.result.get(field) {
      Some(Value::String(s)) => Ok(s),
      Some(other) => Err(Error::InvalidResponse(format!(
        "field {field:?} is not a string: {other}"
      ))),
      None => Err(Error::InvalidResponse(format!("field {field:?} is missing"))),
    }
  }

  /// Like [`Self::string_field`], but a missing, null or empty value is
  /// `None`.
  pub fn optional_string_field(&self, field: &str) -> Result<Option<&str>> {
    match self.result.get(field) {
      None | Some(Value::Null) => Ok(None),
      Some(Value::String(s)) if s.is_empty() => Ok(None),
      Some(_) => self.string_field(field).map(Some),
    }
  }
}

/// The update-set picker: the current selection plus every other choice.
#[derive(Debug, Deserialize)]
pub struct PickerEnvelope {
  pub result: Picker,
}

#[derive(Debug, Deserialize)]
pub struct Picker {
  pub current:     PickerItem,
  #[serde(rename = "updateSet", default)]
  pub update_sets: Vec<PickerItem>,
}

/// One update set as the picker endpoint sends and accepts it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickerItem {
  pub sys_id: String,
  pub name:   String,
}
