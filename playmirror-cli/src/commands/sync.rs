//! `playmirror sync` — reconcile playlists into the mirror.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use playmirror_sync::{
    progress::{self, SyncProgress},
    targets::read_playlist_file,
    Pipeline, PlaylistSummary, SyncEvent, Targets, TrackAction, TrackOutcome,
};

use super::{load_settings, MirrorArgs, SourceArgs};

/// Arguments for `playmirror sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub mirror: MirrorArgs,

    /// Sync every playlist of this user (ignored with a playlist file).
    #[arg(long, env = "SOURCE_USER_ID")]
    pub user_id: Option<String>,

    /// File listing playlist ids to sync, one per line.
    #[arg(long, env = "PLAYLIST_FILE", value_name = "PATH")]
    pub playlist_file: Option<PathBuf>,

    /// Report what would change without writing to the mirror.
    #[arg(long)]
    pub dry_run: bool,

    /// Ignore the progress of an interrupted run and start over.
    #[arg(long)]
    pub restart: bool,
}

impl SyncArgs {
    pub fn run(self, config: Option<&Path>) -> Result<()> {
        let settings = load_settings(config)?;
        let targets = self.targets()?;

        let progress_path = progress::default_path()?;
        if self.restart && !self.dry_run {
            progress::save(&progress_path, &SyncProgress::default())
                .context("failed to reset sync progress")?;
        }
        // A dry run with --restart ignores recorded progress.
        let progress_path = (!(self.restart && self.dry_run)).then_some(progress_path.as_path());

        let source = self.source.client(&settings);
        let store = self.mirror.store(&settings);
        let pipeline = Pipeline::new(&source, &store, settings);

        let report = pipeline
            .run(&targets, progress_path, self.dry_run, &mut print_event)
            .context("sync aborted")?;

        let prefix = if self.dry_run { "[dry-run] " } else { "" };
        println!(
            "{prefix}{} playlists: {} synced, {} resumed, {} failed | {}",
            report.playlists,
            report.succeeded,
            report.resumed,
            report.failed,
            summary_line(&report.summary)
        );
        if !report.is_success() {
            bail!("{} of {} playlists failed", report.failed, report.playlists);
        }
        Ok(())
    }

    fn targets(&self) -> Result<Targets> {
        if let Some(path) = &self.playlist_file {
            let ids = read_playlist_file(path)
                .with_context(|| format!("failed to read playlist file {}", path.display()))?;
            if ids.is_empty() {
                bail!("playlist file {} lists no playlists", path.display());
            }
            return Ok(Targets::Playlists(ids));
        }
        match &self.user_id {
            Some(user) => Ok(Targets::User(user.clone())),
            None => bail!("set SOURCE_USER_ID (or --user-id), or give a playlist file"),
        }
    }
}

fn print_event(event: &SyncEvent) {
    match event {
        SyncEvent::PlaylistStarted {
            position,
            total,
            info,
        } => println!(
            "{} [{position}/{total}] {} ({}, {} tracks)",
            "▶".cyan(),
            info.name.bold(),
            info.id,
            info.track_count
        ),
        SyncEvent::Track(outcome) => println!("  {}", colored_outcome(outcome)),
        SyncEvent::PlaylistFinished { info, summary, .. } => {
            println!("{} {}: {}", "✓".green(), info.name, summary_line(summary))
        }
        SyncEvent::PlaylistFailed {
            position,
            total,
            playlist,
            error,
        } => println!(
            "{} [{position}/{total}] playlist {playlist} failed: {error}",
            "✗".red().bold()
        ),
        SyncEvent::PlaylistResumed {
            position,
            total,
            info,
        } => println!(
            "{}",
            format!(
                "· [{position}/{total}] {} ({}) already synced, skipping",
                info.name, info.id
            )
            .bright_black()
        ),
    }
}

fn colored_outcome(outcome: &TrackOutcome) -> String {
    let line = outcome.to_string();
    match outcome.action {
        TrackAction::Add => line.green().to_string(),
        TrackAction::Update => line.yellow().to_string(),
        TrackAction::Retire => line.red().to_string(),
        TrackAction::Skip => line.bright_black().to_string(),
        TrackAction::Error => line.red().bold().to_string(),
        TrackAction::WouldAdd | TrackAction::WouldUpdate | TrackAction::WouldRetire => {
            line.cyan().to_string()
        }
    }
}

fn summary_line(summary: &PlaylistSummary) -> String {
    let mut line = format!(
        "{} added, {} updated, {} unchanged, {} retired",
        summary.added, summary.updated, summary.unchanged, summary.retired
    );
    if summary.skipped > 0 {
        line.push_str(&format!(", {} skipped", summary.skipped));
    }
    if summary.errors > 0 {
        line.push_str(&format!(", {} errors", summary.errors));
    }
    line
}
