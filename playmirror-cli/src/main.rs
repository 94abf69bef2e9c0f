//! playmirror — mirror music playlists into a page-store database.
//!
//! # Usage
//!
//! ```text
//! playmirror sync [--playlist-file <path>] [--dry-run] [--restart]
//! playmirror diff <playlist>
//! playmirror verify
//! playmirror progress [--clear] [--json]
//! ```
//!
//! Credentials come from the environment (a `.env` file is honoured):
//! `SOURCE_COOKIE`, `SOURCE_USER_ID`, `MIRROR_TOKEN`, `MIRROR_DATABASE_ID`,
//! and optionally `PLAYLIST_FILE`.

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{diff::DiffArgs, progress::ProgressArgs, sync::SyncArgs, verify::VerifyArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "playmirror",
    version,
    about = "Keep a database of your music playlists in sync with the source",
    long_about = None,
)]
struct Cli {
    /// Settings file (default: ~/.playmirror/config.yaml).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Reconcile playlists into the mirror database.
    Sync(SyncArgs),

    /// Show what a sync of one playlist would change, without writing.
    Diff(DiffArgs),

    /// Check that the mirror database has the expected fields.
    Verify(VerifyArgs),

    /// Show or clear the resume state of an interrupted sync.
    Progress(ProgressArgs),
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();
    let cli = Cli::parse();
    let config = cli.config.as_deref();
    match cli.command {
        Commands::Sync(args) => args.run(config),
        Commands::Diff(args) => args.run(config),
        Commands::Verify(args) => args.run(config),
        Commands::Progress(args) => args.run(),
    }
}
