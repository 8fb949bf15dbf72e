//! `mardi`: resolve identifiers, build claims and merge duplicates on the
//! MaRDI portal.
//!
//! # Usage
//!
//! ```
//! mardi resolve "wd:Q5"
//! mardi claim "wdt:P31" "MaRDI person profile"
//! MARDI_CLIENT__USER=bot MARDI_CLIENT__PASSWORD=secret mardi merge-authors Q1 Q2
//! ```
//!
//! Results are printed to stdout as JSON; logs go to stderr.

mod commands;

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use mardi_client::MergeConfig;
use mardi_wikibase::{ClientConfig, Portal};
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "mardi", version, about = "Client for the MaRDI knowledge graph")]
struct Cli {
  /// Path to a TOML config file with `[client]` and `[merge]` sections.
  #[arg(short, long, default_value = "mardi.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
  /// Resolve an id, `wd:`/`wdt:` reference or label. Unknown labels create
  /// a draft entity.
  Resolve {
    identifier: String,
    /// Resolve as a property rather than an item.
    #[arg(long)]
    property:   bool,
  },

  /// Build the claim for a property and value without writing it.
  Claim {
    property: String,
    value:    String,
    /// Language of a monolingual-text value.
    #[arg(long)]
    language: Option<String>,
    /// Additional claim fields as `key=value`.
    #[arg(long = "extra", value_name = "KEY=VALUE")]
    extra:    Vec<String>,
  },

  /// Find items whose property has the given value.
  Search {
    property: String,
    value:    String,
    /// Match the value as a number instead of a string.
    #[arg(long)]
    number:   bool,
  },

  /// Merge two author items.
  MergeAuthors { source: String, target: String },

  /// Merge two publication items.
  MergePublications { source: String, target: String },
}

// ─── Config file ─────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Settings {
  client: ClientConfig,
  merge:  MergeConfig,
}

fn load_settings(path: PathBuf) -> Result<Settings> {
  config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(
      config::Environment::with_prefix("MARDI")
        .separator("__")
        .try_parsing(true),
    )
    .build()
    .context("failed to read config")?
    .try_deserialize()
    .context("failed to deserialise settings")
}

// ─── Entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let settings = load_settings(cli.config)?;
  let portal = Portal::connect(&settings.client)
    .await
    .context("failed to connect to the portal")?;

  let output = commands::run(&portal, settings.merge, cli.command).await?;
  println!("{}", serde_json::to_string_pretty(&output)?);
  Ok(())
}
