use anyhow::Result;

use staytime_config::StaytimeConfig;
use staytime_core::RankedEntry;
use staytime_tracker::{format_duration, rank};

use crate::runtime::open_directory;

/// Print the current top-N without sending or resetting anything.
pub async fn run(config: &StaytimeConfig, json: bool) -> Result<()> {
    let directory = open_directory(config)?;
    let snapshot = directory.snapshot().await?;
    let ranked = rank(&snapshot.profiles, config.top_n());

    if json {
        println!("{}", serde_json::to_string_pretty(&ranked)?);
    } else {
        print!("{}", render_table(&ranked));
    }
    if !snapshot.failures.is_empty() {
        eprintln!("{} unreadable record(s) skipped", snapshot.failures.len());
    }
    Ok(())
}

fn render_table(ranked: &[RankedEntry]) -> String {
    if ranked.is_empty() {
        return "No staying time recorded this week.\n".to_string();
    }
    let name_width = ranked
        .iter()
        .map(|e| e.user_name.chars().count())
        .max()
        .unwrap_or(0)
        .max("user".len());

    let mut out = format!("{:<4} {:<name_width$} {:>20}  {}\n", "rank", "user", "user id", "weekly");
    for (i, entry) in ranked.iter().enumerate() {
        out.push_str(&format!(
            "{:<4} {:<name_width$} {:>20}  {}\n",
            i + 1,
            entry.user_name,
            entry.user_id,
            format_duration(entry.weekly_staying_time)
        ));
    }
    out
}
