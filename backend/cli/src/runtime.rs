//! Builds the shared pieces every command needs from the loaded config.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use staytime_channels::DiscordSink;
use staytime_config::{DirectoryBackend, StaytimeConfig};
use staytime_core::{LogSink, MessagingSink};
use staytime_directory::{Directory, InMemoryDirectory, SqliteDirectory};
use staytime_tracker::AnnouncerConfig;

pub fn open_directory(config: &StaytimeConfig) -> Result<Arc<dyn Directory>> {
    let directory: Arc<dyn Directory> = match config.directory_backend() {
        DirectoryBackend::Sqlite => Arc::new(
            SqliteDirectory::open(config.sqlite_path(), config.collection())
                .with_context(|| format!("opening {}", config.sqlite_path()))?,
        ),
        DirectoryBackend::Memory => Arc::new(InMemoryDirectory::new()),
    };
    info!(backend = directory.name(), collection = %config.collection(), "Directory ready");
    Ok(directory)
}

/// Discord when a token is configured and this is not a dry run; the log otherwise.
pub fn messaging_sink(config: &StaytimeConfig, dry_run: bool) -> Arc<dyn MessagingSink> {
    match config.bot_token() {
        Some(token) if !dry_run => Arc::new(DiscordSink::new(token)),
        _ => Arc::new(LogSink),
    }
}

pub fn required<'a>(value: Option<&'a str>, path: &str) -> Result<&'a str> {
    value.with_context(|| format!("{path} is not configured"))
}

pub fn announcer_config(config: &StaytimeConfig) -> AnnouncerConfig {
    AnnouncerConfig {
        // Dry runs may not have a channel; the log sink ignores it.
        text_channel_id: config.text_channel_id().unwrap_or_default().to_string(),
        top_n: config.top_n(),
        card_color: config.card_color(),
    }
}
