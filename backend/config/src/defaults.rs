//! Config defaults: fill every unset field so the effective config is explicit.

use crate::schema::{
    DirectoryConfig, LeaderboardConfig, LoggingConfig, StaytimeConfig, DEFAULT_CARD_COLOR,
    DEFAULT_LOG_DIR, DEFAULT_LOG_LEVEL, DEFAULT_RESET_CRON, DEFAULT_SQLITE_PATH, DEFAULT_TOP_N,
};

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: StaytimeConfig) -> StaytimeConfig {
    let config = apply_profile_default(config);
    let config = apply_leaderboard_defaults(config);
    let config = apply_directory_defaults(config);
    apply_logging_defaults(config)
}

fn apply_profile_default(mut config: StaytimeConfig) -> StaytimeConfig {
    config.profile.get_or_insert_with(Default::default);
    config
}

fn apply_leaderboard_defaults(mut config: StaytimeConfig) -> StaytimeConfig {
    let lb = config.leaderboard.get_or_insert_with(LeaderboardConfig::default);
    lb.top_n.get_or_insert(DEFAULT_TOP_N);
    lb.reset_cron
        .get_or_insert_with(|| DEFAULT_RESET_CRON.to_string());
    lb.card_color.get_or_insert(DEFAULT_CARD_COLOR);
    config
}

/// The collection default depends on the profile, so this runs after it.
fn apply_directory_defaults(mut config: StaytimeConfig) -> StaytimeConfig {
    let profile = config.effective_profile();
    let dir = config.directory.get_or_insert_with(DirectoryConfig::default);
    dir.backend.get_or_insert_with(Default::default);
    dir.path.get_or_insert_with(|| DEFAULT_SQLITE_PATH.to_string());
    dir.collection
        .get_or_insert_with(|| profile.default_collection().to_string());
    config
}

fn apply_logging_defaults(mut config: StaytimeConfig) -> StaytimeConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    logging
        .level
        .get_or_insert_with(|| DEFAULT_LOG_LEVEL.to_string());
    logging.dir.get_or_insert_with(|| DEFAULT_LOG_DIR.to_string());
    config
}
