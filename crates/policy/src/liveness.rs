//! Extension liveness derived from its heartbeat.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// The extension heartbeats roughly every ten minutes; fifteen tolerates
/// one late beat.
pub const ACTIVE_WINDOW_MINUTES: f64 = 15.0;

/// Whether the browser extension is currently reporting in.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LivenessStatus {
    /// The extension has never reported in.
    Unknown,
    /// Heartbeat seen within the active window.
    Active,
    /// Heartbeat is stale; `label` says how stale ("3 hours ago").
    Inactive { label: String },
}

impl LivenessStatus {
    /// Short headline for the status badge.
    pub fn headline(&self) -> &'static str {
        match self {
            LivenessStatus::Unknown => "Not connected yet",
            LivenessStatus::Active => "Active",
            LivenessStatus::Inactive { .. } => "Inactive",
        }
    }

    /// Lower-case identifier, suitable for CSS classes.
    pub fn as_str(&self) -> &'static str {
        match self {
            LivenessStatus::Unknown => "unknown",
            LivenessStatus::Active => "active",
            LivenessStatus::Inactive { .. } => "inactive",
        }
    }

    /// "Last seen" label for inactive extensions.
    pub fn label(&self) -> Option<&str> {
        match self {
            LivenessStatus::Inactive { label } => Some(label),
            _ => None,
        }
    }
}

/// Classify the extension from its last heartbeat.
///
/// Depends on wall-clock time, so callers must re-evaluate periodically and
/// not only when a new heartbeat arrives.
pub fn classify(last_seen: Option<DateTime<Utc>>, now: DateTime<Utc>) -> LivenessStatus {
    let Some(last_seen) = last_seen else {
        return LivenessStatus::Unknown;
    };

    let minutes_ago = (now - last_seen).num_milliseconds() as f64 / 60_000.0;
    if minutes_ago <= ACTIVE_WINDOW_MINUTES {
        return LivenessStatus::Active;
    }

    LivenessStatus::Inactive {
        label: time_ago_label(minutes_ago),
    }
}

fn time_ago_label(minutes: f64) -> String {
    let hours = minutes / 60.0;
    let days = hours / 24.0;

    if days > 7.0 {
        "over a week ago".to_string()
    } else if days > 1.5 {
        format!("{} days ago", days.round() as i64)
    } else if hours > 1.5 {
        format!("{} hours ago", hours.round() as i64)
    } else {
        format!("{} minutes ago", minutes.round() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_unknown_without_heartbeat() {
        assert_eq!(classify(None, now()), LivenessStatus::Unknown);
    }

    #[test]
    fn test_active_within_window() {
        let status = classify(Some(now() - Duration::minutes(10)), now());
        assert_eq!(status, LivenessStatus::Active);

        let status = classify(Some(now() - Duration::minutes(15)), now());
        assert_eq!(status, LivenessStatus::Active);
    }

    #[test]
    fn test_future_heartbeat_counts_as_active() {
        let status = classify(Some(now() + Duration::minutes(2)), now());
        assert_eq!(status, LivenessStatus::Active);
    }

    #[test]
    fn test_inactive_minutes() {
        let status = classify(Some(now() - Duration::minutes(16)), now());
        assert_eq!(
            status,
            LivenessStatus::Inactive {
                label: "16 minutes ago".to_string()
            }
        );
    }

    #[test]
    fn test_inactive_hours() {
        let status = classify(Some(now() - Duration::minutes(200)), now());
        assert_eq!(status.label(), Some("3 hours ago"));
    }

    #[test]
    fn test_inactive_days() {
        let status = classify(Some(now() - Duration::days(2)), now());
        assert_eq!(status.label(), Some("2 days ago"));
    }

    #[test]
    fn test_inactive_over_a_week() {
        let status = classify(Some(now() - Duration::days(9)), now());
        assert_eq!(status.label(), Some("over a week ago"));
    }

    #[test]
    fn test_granularity_boundaries() {
        // 90 minutes is not more than 1.5 hours, so it stays in minutes.
        let status = classify(Some(now() - Duration::minutes(90)), now());
        assert_eq!(status.label(), Some("90 minutes ago"));

        // 36 hours is not more than 1.5 days, so it stays in hours.
        let status = classify(Some(now() - Duration::hours(36)), now());
        assert_eq!(status.label(), Some("36 hours ago"));
    }

    #[test]
    fn test_status_serializes_with_tag() {
        let value = serde_json::to_value(LivenessStatus::Inactive {
            label: "2 days ago".to_string(),
        })
        .unwrap();
        assert_eq!(value["status"], "inactive");
        assert_eq!(value["label"], "2 days ago");
    }
}
