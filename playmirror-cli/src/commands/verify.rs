//! `playmirror verify` — check the mirror database layout.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use playmirror_mirror::MirrorStore;
use playmirror_sync::RetryPolicy;

use super::{load_settings, MirrorArgs};

#[derive(Args, Debug)]
pub struct VerifyArgs {
    #[command(flatten)]
    pub mirror: MirrorArgs,
}

impl VerifyArgs {
    pub fn run(self, config: Option<&Path>) -> Result<()> {
        let settings = load_settings(config)?;
        let store = self.mirror.store(&settings);
        let retry = RetryPolicy::from(&settings.retry);

        let schema = retry
            .run("read schema", || store.schema())
            .context("could not read the mirror database")?;
        let title = schema.verify().context("mirror database layout is wrong")?;

        println!(
            "{} mirror database {} has every required field (title field `{title}`)",
            "✓".green(),
            self.mirror.database_id.bold()
        );
        Ok(())
    }
}
