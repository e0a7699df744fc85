// Relative time labels

use chrono::{DateTime, Utc};

/// Label like "Just now", "45 min ago" or "2 hr ago"
///
/// Elapsed time is floored to whole minutes and hours. Anything in the
/// future counts as "Just now".
pub fn human_time(created: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = (now - created).num_minutes();
    if minutes < 1 {
        return "Just now".to_string();
    }
    if minutes < 60 {
        return format!("{} min ago", minutes);
    }
    format!("{} hr ago", minutes / 60)
}
