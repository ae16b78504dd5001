//! staytime runtime configuration schema.
//!
//! Every field is optional on disk; [`crate::defaults`] fills the gaps and the
//! `effective_*` accessors read the result.

use serde::{Deserialize, Serialize};

/// Default number of ranked slots in the weekly announcement.
pub const DEFAULT_TOP_N: usize = 3;

/// Monday 09:00 (UTC), seconds-first cron syntax.
pub const DEFAULT_RESET_CRON: &str = "0 0 9 * * Mon";

pub const DEFAULT_CARD_COLOR: u32 = 0x00ff00;

pub const DEFAULT_SQLITE_PATH: &str = "staytime.db";

pub const DEFAULT_LOG_LEVEL: &str = "info";

pub const DEFAULT_LOG_DIR: &str = "logs";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaytimeConfig {
    /// Run profile; selects the env file and the default collection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<RunProfile>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discord: Option<DiscordConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leaderboard: Option<LeaderboardConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<DirectoryConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunProfile {
    Dev,
    #[default]
    Prod,
}

impl RunProfile {
    pub fn env_file(self) -> &'static str {
        match self {
            RunProfile::Dev => ".env.dev",
            RunProfile::Prod => ".env.prod",
        }
    }

    /// Collection used when the config does not name one.
    pub fn default_collection(self) -> &'static str {
        match self {
            RunProfile::Dev => "test_profiles",
            RunProfile::Prod => "user_profiles",
        }
    }
}

impl std::str::FromStr for RunProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dev" | "development" => Ok(RunProfile::Dev),
            "prod" | "production" => Ok(RunProfile::Prod),
            other => Err(format!("unknown profile '{other}'; use 'dev' or 'prod'")),
        }
    }
}

impl std::fmt::Display for RunProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            RunProfile::Dev => "dev",
            RunProfile::Prod => "prod",
        })
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscordConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_token: Option<String>,

    /// Voice channel whose occupancy is tracked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_channel_id: Option<String>,

    /// Text channel that receives session and leaderboard messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_channel_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_n: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_cron: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_color: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectoryBackend {
    #[default]
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<DirectoryBackend>,

    /// SQLite database file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Table holding the profile records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

// ---------------------------------------------------------------------------
// Effective values
// ---------------------------------------------------------------------------

impl StaytimeConfig {
    pub fn effective_profile(&self) -> RunProfile {
        self.profile.unwrap_or_default()
    }

    pub fn bot_token(&self) -> Option<&str> {
        self.discord.as_ref()?.bot_token.as_deref()
    }

    pub fn voice_channel_id(&self) -> Option<&str> {
        self.discord.as_ref()?.voice_channel_id.as_deref()
    }

    pub fn text_channel_id(&self) -> Option<&str> {
        self.discord.as_ref()?.text_channel_id.as_deref()
    }

    pub fn top_n(&self) -> usize {
        self.leaderboard
            .as_ref()
            .and_then(|l| l.top_n)
            .unwrap_or(DEFAULT_TOP_N)
    }

    pub fn reset_cron(&self) -> &str {
        self.leaderboard
            .as_ref()
            .and_then(|l| l.reset_cron.as_deref())
            .unwrap_or(DEFAULT_RESET_CRON)
    }

    pub fn card_color(&self) -> u32 {
        self.leaderboard
            .as_ref()
            .and_then(|l| l.card_color)
            .unwrap_or(DEFAULT_CARD_COLOR)
    }

    pub fn directory_backend(&self) -> DirectoryBackend {
        self.directory
            .as_ref()
            .and_then(|d| d.backend)
            .unwrap_or_default()
    }

    pub fn sqlite_path(&self) -> &str {
        self.directory
            .as_ref()
            .and_then(|d| d.path.as_deref())
            .unwrap_or(DEFAULT_SQLITE_PATH)
    }

    pub fn collection(&self) -> &str {
        self.directory
            .as_ref()
            .and_then(|d| d.collection.as_deref())
            .unwrap_or_else(|| self.effective_profile().default_collection())
    }

    pub fn log_level(&self) -> &str {
        self.logging
            .as_ref()
            .and_then(|l| l.level.as_deref())
            .unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn log_dir(&self) -> &str {
        self.logging
            .as_ref()
            .and_then(|l| l.dir.as_deref())
            .unwrap_or(DEFAULT_LOG_DIR)
    }
}
