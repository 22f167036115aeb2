//! Filesystem projection of cached entries.
//!
//! Every configured field of an entry lives in its own file:
//!
//! ```text
//! <root>/<scope name, lower-cased>/<table>/<sanitized unique key>/<field>.<extension>
//! ```

use std::path::{Component, Path, PathBuf};

use crate::{Error, Result};

/// Make `raw` safe to use as a single path component.
///
/// Spaces and the joining characters `& _ = + :` become `-`; every other
/// character that is not an ASCII letter, digit, `-` or `.` is dropped; runs
/// of `-` collapse to one and leading/trailing `-` are trimmed. Returns
/// `None` when nothing usable is left (including `.` and `..`).
pub fn sanitize_key(raw: &str) -> Option<String> {
  let mut out = String::with_capacity(raw.len());
  for c in raw.chars() {
    let mapped = match c {
      ' ' | '&' | '_' | '=' | '+' | ':' => '-',
      c if c.is_ascii_alphanumeric() || c == '.' || c == '-' => c,
      _ => continue,
    };
    if mapped == '-' && out.ends_with('-') {
      continue;
    }
    out.push(mapped);
  }

  let trimmed = out.trim_matches('-');
  if trimmed.is_empty() || trimmed.chars().all(|c| c == '.') {
    None
  } else {
    Some(trimmed.to_owned())
  }
}

/// `value` as a path component, if it is exactly one plain component.
/// Absolute paths, `.`/`..` and anything with a separator are rejected.
fn single_component<'a>(what: &'static str, value: &'a str) -> Result<&'a str> {
  let mut components = Path::new(value).components();
  let plain = matches!(
    (components.next(), components.next()),
    (Some(Component::Normal(_)), None)
  );
  if plain && !value.contains(['/', '\\']) {
    Ok(value)
  } else {
    Err(Error::InvalidPathComponent { what, value: value.to_owned() })
  }
}

/// Maps (scope, table, unique key, field) tuples to files under one root.
#[derive(Debug, Clone)]
pub struct Projection {
  root: PathBuf,
}

impl Projection {
  pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into() } }

  pub fn root(&self) -> &Path { &self.root }

  /// Directory holding every field file of one entry.
  pub fn dir_for(&self, table: &str, scope_name: &str, unique_key: &str) -> Result<PathBuf> {
    let scope = scope_name.to_lowercase();
    let scope = single_component("scope name", &scope)?;
    let table = single_component("table name", table)?;
    let key = sanitize_key(unique_key)
      .ok_or_else(|| Error::InvalidUniqueKey(unique_key.to_owned()))?;
    Ok(self.root.join(scope).join(table).join(key))
  }

  /// File holding one field of one entry.
  pub fn path_for(
    &self,
    table: &str,
    scope_name: &str,
    unique_key: &str,
    field: &str,
    extension: &str,
  ) -> Result<PathBuf> {
    let file = format!("{field}.{extension}");
    let file = single_component("field file name", &file)?;
    Ok(self.dir_for(table, scope_name, unique_key)?.join(file))
  }

  /// Write one field's content, creating directories as needed. Returns the
  /// file written.
  pub async fn write_field(
    &self,
    table: &str,
    scope_name: &str,
    unique_key: &str,
    field: &str,
    extension: &str,
    content: &[u8],
  ) -> Result<PathBuf> {
    let path = self.path_for(table, scope_name, unique_key, field, extension)?;
    if let Some(dir) = path.parent() {
      tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| Error::Io { path: dir.to_path_buf(), source })?;
    }

    if tokio::fs::try_exists(&path).await.unwrap_or(false) {
      tracing::debug!(path = %path.display(), "overwriting field file");
    }
    tokio::fs::write(&path, content)
      .await
      .map_err(|source| Error::Io { path: path.clone(), source })?;
    Ok(path)
  }

  /// Read one field file.
  pub async fn read_field(&self, path: &Path) -> Result<Vec<u8>> {
    tracing::debug!(path = %path.display(), "reading field file");
    tokio::fs::read(path)
      .await
      .map_err(|source| Error::Io { path: path.to_path_buf(), source })
  }
}
