//! Types shared between the orchestrator and the HTTP transport
//!
//! The public trigger's JSON bodies use camelCase field names and ISO-8601
//! timestamps with millisecond precision and a `Z` suffix.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};

/// Result of a successful profile update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOutcome {
    pub success: bool,
    pub message: String,
    /// File name of the avatar that was applied
    pub pfp_file: String,
}

impl UpdateOutcome {
    pub fn applied(pfp_file: impl Into<String>) -> Self {
        let pfp_file = pfp_file.into();
        UpdateOutcome {
            success: true,
            message: format!("Profile updated with {pfp_file}!"),
            pfp_file,
        }
    }
}

/// Rate-limit state attached to a successful public update
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitSnapshot {
    pub remaining: u32,
    pub reset_time: String,
}

/// 200 body of the public trigger
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUpdateResponse {
    pub success: bool,
    pub message: String,
    pub pfp_file: String,
    pub rate_limit: RateLimitSnapshot,
}

/// 429 body of the public trigger
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitExceededResponse {
    pub error: String,
    pub message: String,
    pub reset_time: String,
    pub limit: u32,
    /// Human label of the window, e.g. "1 hour"
    pub window: String,
}

/// 500 body of the public trigger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateFailedResponse {
    pub error: String,
    pub message: String,
}

/// Format an instant as `2024-05-01T12:00:00.000Z`
pub fn to_iso8601(t: SystemTime) -> String {
    DateTime::<Utc>::from(t).to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Describe a window length in the largest whole unit, e.g. "1 hour", "90 seconds"
pub fn describe_window(window: Duration) -> String {
    let secs = window.as_secs();
    if secs == 0 {
        return format!("{} milliseconds", window.as_millis());
    }

    let (amount, unit) = if secs % 86_400 == 0 {
        (secs / 86_400, "day")
    } else if secs % 3_600 == 0 {
        (secs / 3_600, "hour")
    } else if secs % 60 == 0 {
        (secs / 60, "minute")
    } else {
        (secs, "second")
    };

    if amount == 1 {
        format!("1 {unit}")
    } else {
        format!("{amount} {unit}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::UNIX_EPOCH;

    #[test]
    fn test_iso8601_format() {
        let t = UNIX_EPOCH + Duration::from_millis(3_600_001);
        assert_eq!(to_iso8601(t), "1970-01-01T01:00:00.001Z");
    }

    #[test]
    fn test_describe_window() {
        assert_eq!(describe_window(Duration::from_secs(3600)), "1 hour");
        assert_eq!(describe_window(Duration::from_secs(7200)), "2 hours");
        assert_eq!(describe_window(Duration::from_secs(1800)), "30 minutes");
        assert_eq!(describe_window(Duration::from_secs(90)), "90 seconds");
        assert_eq!(describe_window(Duration::from_secs(86_400)), "1 day");
        assert_eq!(describe_window(Duration::from_millis(250)), "250 milliseconds");
    }

    #[test]
    fn test_outcome_json_field_names() {
        let json = serde_json::to_value(UpdateOutcome::applied("cat.png")).unwrap();
        assert_eq!(json["pfpFile"], "cat.png");
        assert_eq!(json["message"], "Profile updated with cat.png!");
        assert_eq!(json["success"], true);
    }
}
