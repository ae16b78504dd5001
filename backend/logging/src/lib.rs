//! Structured logging for staytime: console output plus a daily-rolling
//! NDJSON file.

pub mod logger;

pub use logger::{init_logger, level_filter, LOG_FILE_PREFIX};
