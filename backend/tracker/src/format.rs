/// Render elapsed seconds as `HH時間MM分SS秒`.
///
/// Hours are unbounded; every field is padded to two digits. Negative input
/// (clock skew between join and leave) renders as zero.
pub fn format_duration(seconds: i64) -> String {
    let total = seconds.max(0);
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    format!("{:02}時間{:02}分{:02}秒", hours, minutes, secs)
}
