//! One-shot weekly run, for deployments driven by an external scheduler.

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use staytime_config::StaytimeConfig;
use staytime_core::AnnounceTrigger;
use staytime_tracker::{Announcer, UserLocks};

use crate::runtime::{announcer_config, messaging_sink, open_directory};

/// A dry run logs the messages and never resets.
pub async fn run(config: &StaytimeConfig, dry_run: bool, no_reset: bool) -> Result<()> {
    let directory = open_directory(config)?;
    let sink = messaging_sink(config, dry_run);
    let announcer = Announcer::new(
        directory,
        sink,
        Arc::new(UserLocks::new()),
        announcer_config(config),
    );

    let mut trigger = AnnounceTrigger::new(if dry_run { "dry-run" } else { "manual" });
    if dry_run || no_reset {
        trigger = trigger.without_reset();
    }

    let report = announcer.run(&trigger).await?;
    if report.reset_failed > 0 {
        warn!(failed = report.reset_failed, "Some weekly counters were not reset");
    }
    info!(run_id = %report.run_id, "Announcement finished");

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
