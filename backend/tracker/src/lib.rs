//! The accounting core: turns voice presence events into per-user staying
//! time, keeps the directory totals, and runs the weekly leaderboard.

pub mod accumulator;
pub mod announcer;
pub mod compose;
pub mod format;
pub mod handler;
pub mod locks;
pub mod ranker;
pub mod resetter;
pub mod session;

#[cfg(test)]
mod scenarios;

pub use accumulator::ProfileAccumulator;
pub use announcer::{Announcer, AnnouncerConfig, RunReport};
pub use compose::{compose_leaderboard, compose_mention_line, compose_session_end};
pub use format::format_duration;
pub use handler::{ClosedSession, PresenceHandler};
pub use locks::UserLocks;
pub use ranker::{rank, DEFAULT_TOP_N};
pub use resetter::{ResetReport, WeeklyResetter};
pub use session::{CompletedSession, JoinOutcome, SessionTracker};
