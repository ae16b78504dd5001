use staytime_core::{RankedEntry, UserProfile};

/// Leaderboard size when none is configured.
pub const DEFAULT_TOP_N: usize = 3;

/// Top `top_n` users by weekly staying time.
///
/// Users with no positive weekly time are left out. The sort is stable, so
/// equal weekly times keep their order from `profiles` (the snapshot order).
pub fn rank(profiles: &[UserProfile], top_n: usize) -> Vec<RankedEntry> {
    let mut qualifying: Vec<RankedEntry> = profiles
        .iter()
        .filter(|p| p.weekly_staying_time > 0)
        .map(RankedEntry::from)
        .collect();
    qualifying.sort_by(|a, b| b.weekly_staying_time.cmp(&a.weekly_staying_time));
    qualifying.truncate(top_n);
    qualifying
}
