//! Notification text for session ends and the weekly leaderboard.

use std::fmt::Write;

use staytime_core::types::DEFAULT_CARD_COLOR;
use staytime_core::{Card, RankedEntry};

use crate::format::format_duration;

const TITLE_NO_PARTICIPANTS: &str = "今週の滞在者なし😢";
const INTRO_NO_PARTICIPANTS: &str = "今週はもくもくしていませんでした…\n";
const INTRO_RANKED: &str = "今週のもくもくを頑張ったユーザーはこちら！\n";
const PLACEHOLDER: &str = "---";

fn mention(user_id: &str) -> String {
    format!("<@{user_id}>")
}

/// One-line thank-you addressed to the user who just left.
pub fn compose_session_end(user_id: &str, formatted_duration: &str) -> String {
    format!(
        "{} お疲れ様でした！今回の滞在時間は {} です。",
        mention(user_id),
        formatted_duration
    )
}

/// The leaderboard card: always exactly `top_n` rank slots.
pub fn compose_leaderboard(entries: &[RankedEntry], top_n: usize) -> Card {
    let shown = entries.len().min(top_n);

    let (title, mut body) = if shown == 0 {
        (TITLE_NO_PARTICIPANTS.to_string(), INTRO_NO_PARTICIPANTS.to_string())
    } else {
        (format!("🔥今週の滞在時間トップ{shown}🔥"), format!("{INTRO_RANKED}\n"))
    };

    for slot in 0..top_n {
        let place = slot + 1;
        // Writing to a String cannot fail.
        let _ = match entries.get(slot) {
            Some(entry) => write!(
                body,
                "**{place}位:** {}\n**滞在時間:** {}\n",
                mention(&entry.user_id),
                format_duration(entry.weekly_staying_time)
            ),
            None => write!(body, "**{place}位:** {PLACEHOLDER}\n**滞在時間:** {PLACEHOLDER}\n"),
        };
    }

    Card {
        title,
        body,
        color: DEFAULT_CARD_COLOR,
    }
}

/// Mentions of up to `top_n` ranked users, in rank order.
///
/// Empty when nobody qualified; callers send nothing in that case.
pub fn compose_mention_line(entries: &[RankedEntry], top_n: usize) -> String {
    entries
        .iter()
        .take(top_n)
        .map(|e| mention(&e.user_id))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, weekly: i64) -> RankedEntry {
        RankedEntry {
            user_id: id.into(),
            user_name: id.into(),
            weekly_staying_time: weekly,
        }
    }

    #[test]
    fn test_session_end_message() {
        let text = compose_session_end("42", &format_duration(3661));
        assert_eq!(text, "<@42> お疲れ様でした！今回の滞在時間は 01時間01分01秒 です。");
    }

    #[test]
    fn test_leaderboard_empty() {
        let card = compose_leaderboard(&[], 3);
        assert_eq!(card.title, "今週の滞在者なし😢");
        assert_eq!(card.body.matches("---").count(), 6);
        assert!(card.body.contains("**1位:** ---"));
        assert!(card.body.contains("**3位:** ---"));
        assert!(!card.body.contains("**4位:**"));
        assert_eq!(card.color, 0x00ff00);
    }

    #[test]
    fn test_leaderboard_one_entry() {
        let card = compose_leaderboard(&[entry("u1", 7200)], 3);
        assert_eq!(card.title, "🔥今週の滞在時間トップ1🔥");
        assert!(card.body.contains("**1位:** <@u1>\n**滞在時間:** 02時間00分00秒\n"));
        assert!(card.body.contains("**2位:** ---\n**滞在時間:** ---\n"));
        assert!(card.body.contains("**3位:** ---\n**滞在時間:** ---\n"));
    }

    #[test]
    fn test_leaderboard_caps_title_and_slots_at_top_n() {
        let entries: Vec<_> = (0..5).map(|i| entry(&format!("u{i}"), 100 - i)).collect();
        let card = compose_leaderboard(&entries, 3);
        assert_eq!(card.title, "🔥今週の滞在時間トップ3🔥");
        assert!(card.body.contains("<@u2>"));
        assert!(!card.body.contains("<@u3>"));
        assert!(!card.body.contains("---"));
    }

    #[test]
    fn test_mention_line() {
        let entries = vec![entry("a", 3), entry("b", 2), entry("c", 1), entry("d", 1)];
        assert_eq!(compose_mention_line(&entries, 3), "<@a> <@b> <@c>");
        assert_eq!(compose_mention_line(&entries[..1], 3), "<@a>");
        assert_eq!(compose_mention_line(&[], 3), "");
    }
}
