//! `fieldsync`: edit fields of remote platform records as local files.
//!
//! # Usage
//!
//! ```
//! fieldsync download -t sys_script_include --sys-id <id>
//! fieldsync upload -t sys_script_include --sys-id <id> -f script
//! fieldsync update-set list --scope global
//! fieldsync --config ~/.config/fieldsync.toml cache
//! ```

mod commands;
mod settings;

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use fieldsync_store_sqlite::SqliteStore;
use fieldsync_sync::{Endpoints, Projection, RestClient, Synchronizer, Transfer};
use settings::Settings;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "fieldsync", author, version, about = "Sync remote record fields to local files")]
struct Cli {
  /// Path to the TOML settings file.
  #[arg(short, long, value_name = "FILE", default_value = "fieldsync.toml", global = true)]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Fetch a record and write its configured fields to files.
  Download {
    #[arg(short, long)]
    table:  String,
    #[arg(long = "sys-id")]
    sys_id: String,
  },

  /// Send local field files back to a downloaded record.
  Upload {
    #[arg(short, long)]
    table:      String,
    #[arg(long = "sys-id")]
    sys_id:     String,
    /// Comma-separated fields to upload.
    #[arg(short, long, value_delimiter = ',', required = true)]
    fields:     Vec<String>,
    /// Record the change in this update set.
    #[arg(long)]
    update_set: Option<String>,
  },

  /// Query a table with an encoded query and print the raw result.
  Search {
    #[arg(short, long)]
    table:  String,
    #[arg(short, long)]
    query:  String,
    /// Extra comma-separated fields to return.
    #[arg(short, long, value_delimiter = ',')]
    fields: Vec<String>,
    #[arg(long, default_value_t = 20)]
    limit:  u32,
  },

  /// List, select or drop cached update sets.
  #[command(subcommand)]
  UpdateSet(UpdateSetCommand),

  /// Drop cached metadata.
  #[command(subcommand)]
  Forget(ForgetCommand),

  /// Print cached scopes, tables and entries.
  Cache,
}

#[derive(Subcommand, Debug)]
pub enum UpdateSetCommand {
  /// List the update sets of a scope, fetching them on first use.
  List {
    #[arg(long, default_value = "global")]
    scope: String,
  },
  /// Make an update set current for its scope.
  Set {
    #[arg(long)]
    scope:      String,
    #[arg(long)]
    update_set: String,
  },
  /// Drop every cached update set.
  Truncate,
}

#[derive(Subcommand, Debug)]
pub enum ForgetCommand {
  Entry {
    #[arg(short, long)]
    table:  String,
    #[arg(long = "sys-id")]
    sys_id: String,
  },
  Table {
    name: String,
  },
  Scope {
    name: String,
  },
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let cli = Cli::parse();

  let settings = Settings::load(&cli.config)
    .with_context(|| format!("failed to load settings from {}", cli.config.display()))?;

  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(settings.log_level()?.into())
        .from_env_lossy(),
    )
    .init();

  if let Some(dir) = settings.db.path.parent()
    && !dir.as_os_str().is_empty()
  {
    std::fs::create_dir_all(dir)
      .with_context(|| format!("failed to create {}", dir.display()))?;
  }
  let store = SqliteStore::open(&settings.db.path)
    .await
    .with_context(|| format!("failed to open cache at {:?}", settings.db.path))?;

  let endpoints = Endpoints::new(&settings.rest.url).context("invalid rest.url")?;
  let client = RestClient::new(settings.rest.client_config())?;

  let transfer = Transfer::new(
    Synchronizer::new(store, client, endpoints),
    settings.tables.clone(),
    Projection::new(&settings.root_directory),
  );

  commands::run(cli.command, &transfer).await
}
