//! `playmirror progress` — resume state of an interrupted sync.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use playmirror_sync::progress::{self, SyncProgress};

/// Arguments for `playmirror progress`.
#[derive(Args, Debug)]
pub struct ProgressArgs {
    /// Forget the recorded progress so the next sync starts over.
    #[arg(long)]
    pub clear: bool,

    /// Emit machine-readable JSON.
    #[arg(long, conflicts_with = "clear")]
    pub json: bool,
}

#[derive(Serialize)]
struct ProgressJson {
    updated_at: Option<String>,
    playlists: Vec<ProgressEntryJson>,
}

#[derive(Serialize)]
struct ProgressEntryJson {
    playlist: String,
    position: u32,
}

#[derive(Tabled)]
struct ProgressRow {
    #[tabled(rename = "position")]
    position: u32,
    #[tabled(rename = "playlist")]
    playlist: String,
}

impl ProgressArgs {
    pub fn run(self) -> Result<()> {
        let path = progress::default_path()?;

        if self.clear {
            if path.exists() {
                progress::save(&path, &SyncProgress::default())
                    .context("failed to clear sync progress")?;
            }
            println!("Sync progress cleared.");
            return Ok(());
        }

        let state = progress::load(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let mut entries: Vec<(String, u32)> = state
            .playlists
            .iter()
            .map(|(id, pos)| (id.clone(), *pos))
            .collect();
        entries.sort_by_key(|(_, pos)| *pos);

        if self.json {
            let payload = ProgressJson {
                updated_at: (!state.is_empty()).then(|| state.updated_at.to_rfc3339()),
                playlists: entries
                    .into_iter()
                    .map(|(playlist, position)| ProgressEntryJson { playlist, position })
                    .collect(),
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&payload)
                    .context("failed to serialize progress JSON")?
            );
            return Ok(());
        }

        if entries.is_empty() {
            println!("No interrupted sync recorded.");
            return Ok(());
        }
        println!(
            "{} playlists completed by an interrupted sync (last update {})",
            entries.len(),
            state.updated_at.to_rfc3339()
        );
        let rows: Vec<ProgressRow> = entries
            .into_iter()
            .map(|(playlist, position)| ProgressRow { position, playlist })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        println!("Run 'playmirror sync' to continue, or 'playmirror progress --clear' to start over.");
        Ok(())
    }
}
