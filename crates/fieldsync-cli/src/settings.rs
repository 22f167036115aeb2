//! Settings file and environment overrides.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use anyhow::{Context as _, Result, bail};
use config::{Config, ConfigBuilder, Environment, File, builder::DefaultState};
use fieldsync_core::config::TablesConfig;
use fieldsync_sync::rest::{DEFAULT_TIMEOUT, RestConfig};
use serde::Deserialize;
use tracing::level_filters::LevelFilter;

/// Environment variables `FIELDSYNC_<SECTION>__<KEY>` override the file.
const ENV_PREFIX: &str = "FIELDSYNC";

#[derive(Debug, Clone, Deserialize)]
pub struct RestSettings {
  pub url:          String,
  #[serde(default)]
  pub user:         String,
  #[serde(default)]
  pub password:     String,
  pub timeout_secs: Option<u64>,
}

impl RestSettings {
  pub fn client_config(&self) -> RestConfig {
    RestConfig {
      user:     self.user.clone(),
      password: self.password.clone(),
      timeout:  self.timeout_secs.map(Duration::from_secs).unwrap_or(DEFAULT_TIMEOUT),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DbSettings {
  pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
  /// Where downloaded fields are written.
  pub root_directory: PathBuf,
  #[serde(default = "default_log_level")]
  pub log_level:      String,
  pub rest:           RestSettings,
  pub db:             DbSettings,
  #[serde(default)]
  pub tables:         TablesConfig,
}

fn default_log_level() -> String { "info".to_owned() }

impl Settings {
  /// Read `path` (if it exists) layered under the environment.
  pub fn load(path: &Path) -> Result<Self> {
    Self::from_builder(
      Config::builder()
        .add_source(File::from(path).required(false))
        .add_source(
          Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__"),
        ),
    )
  }

  fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
    let mut settings: Self = builder
      .build()
      .context("failed to read settings")?
      .try_deserialize()
      .context("failed to deserialise settings")?;
    settings.validate()?;

    settings.root_directory = expand_tilde(&settings.root_directory);
    settings.db.path = expand_tilde(&settings.db.path);
    Ok(settings)
  }

  fn validate(&self) -> Result<()> {
    if self.rest.url.trim().is_empty() {
      bail!("rest.url must be set");
    }
    if self.root_directory.as_os_str().is_empty() {
      bail!("root_directory must be set");
    }
    self.log_level()?;
    self.tables.validate().context("invalid table configuration")?;
    Ok(())
  }

  pub fn log_level(&self) -> Result<LevelFilter> {
    self
      .log_level
      .parse()
      .with_context(|| format!("invalid log_level {:?}", self.log_level))
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use config::FileFormat;

  use super::*;

  fn parse(toml: &str) -> Result<Settings> {
    Settings::from_builder(Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
  }

  const FULL: &str = r#"
root_directory = "/srv/fieldsync"
log_level      = "debug"

[rest]
url          = "https://dev.example.com"
user         = "admin"
password     = "secret"
timeout_secs = 5

[db]
path = "/var/lib/fieldsync/cache.db"

[[tables]]
name       = "sys_script_include"
unique_key = "name"
fields     = [{ field = "script", extension = "js" }]
"#;

  #[test]
  fn full_settings_parse() {
    let s = parse(FULL).unwrap();
    assert_eq!(s.root_directory, PathBuf::from("/srv/fieldsync"));
    assert_eq!(s.log_level().unwrap(), LevelFilter::DEBUG);
    assert_eq!(s.rest.client_config().timeout, Duration::from_secs(5));
    let table = s.tables.require("sys_script_include").unwrap();
    assert_eq!(table.unique_key, "name");
    assert_eq!(table.fields[0].extension, "js");
  }

  #[test]
  fn defaults_apply() {
    let s = parse(
      r#"
root_directory = "out"
[rest]
url = "https://dev.example.com"
[db]
path = "cache.db"
"#,
    )
    .unwrap();
    assert_eq!(s.log_level().unwrap(), LevelFilter::INFO);
    assert_eq!(s.rest.client_config().timeout, DEFAULT_TIMEOUT);
    assert!(s.rest.user.is_empty());
    assert_eq!(s.tables.iter().count(), 0);
  }

  #[test]
  fn invalid_tables_are_rejected() {
    let broken = FULL.replace("unique_key = \"name\"", "");
    assert!(parse(&broken).is_err());

    let broken = FULL.replace("extension = \"js\"", "extension = \"\"");
    assert!(parse(&broken).is_err());
  }

  #[test]
  fn empty_url_and_bad_level_are_rejected() {
    assert!(parse(&FULL.replace("https://dev.example.com", "")).is_err());
    assert!(parse(&FULL.replace("\"debug\"", "\"chatty\"")).is_err());
  }

  #[test]
  fn tilde_expands_to_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(expand_tilde(Path::new("~/x/cache.db")), PathBuf::from(home).join("x/cache.db"));
    assert_eq!(expand_tilde(Path::new("/abs")), PathBuf::from("/abs"));
  }
}
