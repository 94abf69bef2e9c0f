//! `playmirror diff` — what a sync of one playlist would change.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use playmirror_core::PlaylistId;
use playmirror_sync::{DiffReport, Pipeline};

use super::{load_settings, MirrorArgs, SourceArgs};

/// Arguments for `playmirror diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Playlist id to compare.
    pub playlist: String,

    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub mirror: MirrorArgs,
}

impl DiffArgs {
    pub fn run(self, config: Option<&Path>) -> Result<()> {
        let settings = load_settings(config)?;
        let source = self.source.client(&settings);
        let store = self.mirror.store(&settings);
        let pipeline = Pipeline::new(&source, &store, settings);

        let playlist = PlaylistId::from(self.playlist.trim());
        let report = pipeline
            .diff(&playlist)
            .with_context(|| format!("diff failed for playlist {playlist}"))?;
        print_report(&report);
        Ok(())
    }
}

fn print_report(report: &DiffReport) {
    println!("{} ({})", report.info.name.bold(), report.info.id);
    if !report.has_bucket {
        println!("{}", "  + playlist row (missing)".green());
    }
    for track in &report.to_add {
        println!(
            "{}",
            format!("  + {} - ID: {}, status: {}", track.name, track.id, track.status()).green()
        );
    }
    for (track, record) in &report.to_update {
        println!(
            "{}",
            format!(
                "  ~ {} - ID: {}, status: {} -> {}",
                track.name,
                track.id,
                record.status,
                track.status()
            )
            .yellow()
        );
    }
    for record in &report.to_retire {
        println!(
            "{}",
            format!(
                "  - {} - ID: {}, status: {}",
                record.name, record.track_id, record.status
            )
            .red()
        );
    }
    println!(
        "{} to add, {} to update, {} unchanged, {} to retire",
        report.to_add.len(),
        report.to_update.len(),
        report.unchanged,
        report.to_retire.len()
    );
}
