//! Config validation: collect every problem in one pass.

use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::schema::{DirectoryBackend, StaytimeConfig};

static SNOWFLAKE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[1-9][0-9]{0,19}$").expect("snowflake pattern is valid"));

static COLLECTION_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("collection pattern is valid")
});

/// What the config will be used for. A one-shot announcement needs no
/// voice channel; a dry run needs no token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purpose {
    Serve,
    Announce,
    Offline,
}

#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

pub fn validate(config: &StaytimeConfig, purpose: Purpose) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_discord(config, purpose, &mut report);
    validate_leaderboard(config, &mut report);
    validate_directory(config, &mut report);
    validate_logging(config, &mut report);
    report
}

fn validate_discord(config: &StaytimeConfig, purpose: Purpose, report: &mut ValidationReport) {
    let needs_discord = purpose != Purpose::Offline;

    if needs_discord && config.bot_token().map(str::is_empty).unwrap_or(true) {
        report.error("discord.botToken", "Discord bot token is required");
    }

    let channels = [
        ("discord.textChannelId", config.text_channel_id(), needs_discord),
        ("discord.voiceChannelId", config.voice_channel_id(), purpose == Purpose::Serve),
    ];
    for (path, value, required) in channels {
        match value {
            Some(id) if !SNOWFLAKE.is_match(id) => {
                report.error(path, format!("'{id}' is not a numeric Discord id"));
            }
            None if required => report.error(path, "Channel id is required"),
            _ => {}
        }
    }
}

fn validate_leaderboard(config: &StaytimeConfig, report: &mut ValidationReport) {
    let top_n = config.top_n();
    if top_n == 0 {
        report.error("leaderboard.topN", "topN must be >= 1");
    } else if top_n > 25 {
        report.warn(
            "leaderboard.topN",
            format!("topN {top_n} makes a very long card; Discord embeds cap at 4096 chars"),
        );
    }

    if let Err(e) = cron::Schedule::from_str(config.reset_cron()) {
        report.error(
            "leaderboard.resetCron",
            format!("Invalid cron expression '{}': {e}", config.reset_cron()),
        );
    }

    if config.card_color() > 0xff_ffff {
        report.error("leaderboard.cardColor", "cardColor must be a 24-bit RGB value");
    }
}

fn validate_directory(config: &StaytimeConfig, report: &mut ValidationReport) {
    let collection = config.collection();
    if !COLLECTION_NAME.is_match(collection) {
        report.error(
            "directory.collection",
            format!("'{collection}' is not a valid collection name"),
        );
    }
    match config.directory_backend() {
        DirectoryBackend::Sqlite if config.sqlite_path().trim().is_empty() => {
            report.error("directory.path", "SQLite path cannot be empty");
        }
        DirectoryBackend::Memory => {
            report.warn("directory.backend", "In-memory directory; totals are lost on restart");
        }
        DirectoryBackend::Sqlite => {}
    }
}

fn validate_logging(config: &StaytimeConfig, report: &mut ValidationReport) {
    let level = config.log_level();
    if !matches!(
        level.to_ascii_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    ) {
        report.warn("logging.level", format!("Unknown log level '{level}'; using info"));
    }
}
