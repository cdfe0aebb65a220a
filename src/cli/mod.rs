//! Command-line interface for imgfetch.
//!
//! Provides commands for fetching an image into the cache, resolving its
//! local path, purging the cache, and inspecting configuration.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use image::DynamicImage;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::config;
use crate::core::{CallbackSink, FetchEngine, FetchError};
use crate::domain::AssetIdentity;

/// imgfetch - Fetch-once image cache
#[derive(Parser, Debug)]
#[command(name = "imgfetch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch an image into the cache (served from disk if already cached)
    Fetch {
        /// Remote image URL
        url: String,

        /// File-name prefix (stored as PREFIX_<name>)
        #[arg(short, long)]
        prefix: Option<String>,
    },

    /// Print the local cache path for an image URL
    Path {
        /// Remote image URL
        url: String,

        /// File-name prefix
        #[arg(short, long)]
        prefix: Option<String>,
    },

    /// Remove every cached image
    Purge,

    /// Show resolved configuration
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Fetch { url, prefix } => fetch(identity(url, prefix)).await,
            Commands::Path { url, prefix } => show_path(identity(url, prefix)),
            Commands::Purge => purge().await,
            Commands::Config => show_config(),
        }
    }
}

fn identity(url: String, prefix: Option<String>) -> AssetIdentity {
    let identity = AssetIdentity::new(url);
    match prefix {
        Some(prefix) => identity.with_prefix(prefix),
        None => identity,
    }
}

fn engine() -> Result<FetchEngine> {
    let cfg = config::config()?;
    FetchEngine::from_config(cfg, Handle::current())
}

/// Request one image and wait for its callback
async fn fetch(identity: AssetIdentity) -> Result<()> {
    let engine = engine()?;
    let path = engine.cached_path(&identity);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let ok_tx = tx.clone();
    let sink = CallbackSink::shared(
        move |image: Arc<DynamicImage>, _: &AssetIdentity| {
            let _ = ok_tx.send(Ok((image.width(), image.height())));
        },
        move |error: &FetchError, _: &AssetIdentity| {
            let _ = tx.send(Err(error.to_string()));
        },
    );

    engine.request(identity.clone(), sink);

    let outcome = rx
        .recv()
        .await
        .context("Engine dropped the request without a callback")?;

    match outcome {
        Ok((width, height)) => {
            println!("{}", path.display());
            eprintln!("[{} cached: {}x{}]", identity, width, height);
            Ok(())
        }
        Err(message) => anyhow::bail!("Failed to fetch {}: {}", identity, message),
    }
}

/// Print the derived local path and whether it is cached
fn show_path(identity: AssetIdentity) -> Result<()> {
    let cfg = config::config()?;
    let store = crate::store::AssetStore::from_config(cfg);
    let file_name = identity.file_name();

    println!("{}", store.path_for(&file_name).display());
    eprintln!(
        "[{}]",
        if store.exists(&file_name) {
            "cached"
        } else {
            "not cached"
        }
    );

    Ok(())
}

async fn purge() -> Result<()> {
    let engine = engine()?;
    let removed = engine
        .remove_all()
        .await
        .with_context(|| format!("Failed to purge {}", engine.store().root().display()))?;

    println!("Removed {} cached file(s)", removed);
    Ok(())
}

/// Show resolved configuration (debug)
fn show_config() -> Result<()> {
    let cfg = config::config()?;

    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    print!(
        "{}",
        serde_yaml::to_string(cfg).context("Failed to render configuration")?
    );

    Ok(())
}
