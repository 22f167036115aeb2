//! URL construction for every remote endpoint the synchronizer calls.

use reqwest::Url;

use crate::{Error, Result};

const TABLE_API: &str = "/api/now/table";
const UPDATE_SET_PICKER: &str = "/api/now/ui/concoursepicker/updateset";

/// Builds endpoint URLs under one instance base URL.
#[derive(Debug, Clone)]
pub struct Endpoints {
  base: String,
}

impl Endpoints {
  /// `base` is the instance root, e.g. `https://dev123.example.com`.
  pub fn new(base: &str) -> Result<Self> {
    let base = base.trim_end_matches('/');
    let url = Url::parse(base)
      .map_err(|e| Error::InvalidArgument(format!("instance url {base:?}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
      return Err(Error::InvalidArgument(format!(
        "instance url {base:?} must be http or https"
      )));
    }
    Ok(Self { base: base.to_owned() })
  }

  pub fn base(&self) -> &str { &self.base }

  /// `value` if it is a plain remote identifier (ASCII letters, digits and
  /// `_`). Anything else could add conditions to an encoded query or segments
  /// to a path.
  fn identifier<'a>(what: &str, value: &'a str) -> Result<&'a str> {
    if !value.is_empty() && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
      Ok(value)
    } else {
      Err(Error::InvalidArgument(format!("invalid {what} {value:?}")))
    }
  }

  fn build(&self, path: &str, params: &[(&str, &str)]) -> Result<String> {
    let url = format!("{}{path}", self.base);
    Url::parse_with_params(&url, params)
      .map(String::from)
      .map_err(|e| Error::InvalidArgument(format!("url {url:?}: {e}")))
  }

  /// `sys_scope` rows whose `sys_id` is `remote_id`.
  pub fn scope_by_id(&self, remote_id: &str) -> Result<String> {
    let remote_id = Self::identifier("scope id", remote_id)?;
    let query = format!("sys_id={remote_id}");
    self.build(&format!("{TABLE_API}/sys_scope"), &[
      ("sysparm_query", query.as_str()),
      ("sysparm_fields", "scope,sys_id"),
    ])
  }

  /// `sys_scope` rows whose scope name is `name`.
  pub fn scope_by_name(&self, name: &str) -> Result<String> {
    let name = Self::identifier("scope name", name)?;
    let query = format!("scope={name}");
    self.build(&format!("{TABLE_API}/sys_scope"), &[
      ("sysparm_query", query.as_str()),
      ("sysparm_fields", "scope,sys_id"),
    ])
  }

  /// The `sys_db_object` definition of table `name`, with its scope.
  pub fn table_by_name(&self, name: &str) -> Result<String> {
    let name = Self::identifier("table name", name)?;
    let query = format!("name={name}");
    self.build(&format!("{TABLE_API}/sys_db_object"), &[
      ("sysparm_query", query.as_str()),
      ("sysparm_fields", "sys_id,sys_scope.sys_id,sys_scope.name,name"),
      ("sysparm_limit", "1"),
    ])
  }

  /// One record of `table`, restricted to `fields`.
  pub fn record(&self, table: &str, remote_id: &str, fields: &[String]) -> Result<String> {
    let table = Self::identifier("table name", table)?;
    let remote_id = Self::identifier("record id", remote_id)?;
    let fields = fields.join(",");
    self.build(&format!("{TABLE_API}/{table}/{remote_id}"), &[(
      "sysparm_fields",
      fields.as_str(),
    )])
  }

  /// Target of a record update, optionally recorded in `update_set`.
  pub fn record_update(
    &self,
    table: &str,
    remote_id: &str,
    fields: &[String],
    scope_name: &str,
    update_set: Option<&str>,
  ) -> Result<String> {
    let table = Self::identifier("table name", table)?;
    let remote_id = Self::identifier("record id", remote_id)?;
    let fields = fields.join(",");
    let mut params = vec![("sysparm_fields", fields.as_str()), ("sysparm_scope", scope_name)];
    if let Some(update_set) = update_set {
      params.push(("sysparm_transaction_update_set", update_set));
    }
    self.build(&format!("{TABLE_API}/{table}/{remote_id}"), &params)
  }

  /// Records of `table` matching an encoded query.
  pub fn search(
    &self,
    table: &str,
    encoded_query: &str,
    fields: &[String],
    limit: u32,
  ) -> Result<String> {
    let table = Self::identifier("table name", table)?;
    let fields = fields.join(",");
    let limit = limit.to_string();
    self.build(&format!("{TABLE_API}/{table}"), &[
      ("sysparm_query", encoded_query),
      ("sysparm_fields", fields.as_str()),
      ("sysparm_limit", limit.as_str()),
    ])
  }

  /// The update-set picker of the scope `scope_remote_id`.
  pub fn update_set_picker(&self, scope_remote_id: &str) -> Result<String> {
    let scope_remote_id = Self::identifier("scope id", scope_remote_id)?;
    self.build(UPDATE_SET_PICKER, &[("sysparm_transaction_scope", scope_remote_id)])
  }
}
