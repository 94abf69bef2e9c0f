//! Subcommands and the connection arguments they share.

pub mod diff;
pub mod progress;
pub mod sync;
pub mod verify;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;

use playmirror_core::Settings;
use playmirror_mirror::{MirrorConfig, NotionStore};
use playmirror_source::{HttpSource, SourceConfig};

/// Credentials for the music listing API.
#[derive(Args, Debug)]
pub struct SourceArgs {
    /// Session cookie sent with every source request.
    #[arg(long, env = "SOURCE_COOKIE", hide_env_values = true)]
    pub cookie: String,
}

impl SourceArgs {
    pub fn client(&self, settings: &Settings) -> HttpSource {
        HttpSource::new(SourceConfig {
            cookie: self.cookie.clone(),
            settings: settings.source.clone(),
            offset: settings.sync.offset(),
        })
    }
}

/// Credentials for the mirror database.
#[derive(Args, Debug)]
pub struct MirrorArgs {
    /// Integration token of the mirror store.
    #[arg(long, env = "MIRROR_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Identifier of the mirror database.
    #[arg(long, env = "MIRROR_DATABASE_ID")]
    pub database_id: String,
}

impl MirrorArgs {
    pub fn store(&self, settings: &Settings) -> NotionStore {
        NotionStore::new(MirrorConfig {
            token: self.token.clone(),
            database_id: self.database_id.clone(),
            settings: settings.mirror.clone(),
        })
    }
}

/// Settings from `--config`, or `~/.playmirror/config.yaml`.
pub fn load_settings(config: Option<&Path>) -> Result<Settings> {
    match config {
        Some(path) => Settings::load_from(path)
            .with_context(|| format!("failed to load settings from {}", path.display())),
        None => Settings::load().context("failed to load settings"),
    }
}
