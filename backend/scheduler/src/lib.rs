#[cfg(unix)]
pub mod manual;
pub mod scheduler;

#[cfg(unix)]
pub use manual::{forward_signals, listen_sigusr1};
pub use scheduler::{parse_schedule, Scheduler};
