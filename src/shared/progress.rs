//! Progress Wire Types
//!
//! Types exchanged between the client and the progress endpoints, plus the
//! derivation rules both sides agree on (percent complete, completion).
//!
//! All types serialize with camelCase field names:
//!
//! ```json
//! { "videoId": "v1", "playlistId": "p1", "watchedSeconds": 30, "totalSeconds": 100, "isCompleted": false }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::error::SharedError;

/// Percent at which a video counts as completed
pub const COMPLETION_THRESHOLD_PERCENT: u8 = 95;

/// Fraction of the video that must be watched before a tick reports completion
pub const COMPLETION_THRESHOLD_RATIO: f64 = 0.95;

/// Derive the stored percent from watched and total seconds.
///
/// Rounds to the nearest integer and clamps to `[0, 100]`. A zero total
/// (metadata not loaded yet) yields 0.
pub fn percent_complete(watched_seconds: u32, total_seconds: u32) -> u8 {
    if total_seconds == 0 {
        return 0;
    }
    let percent = (f64::from(watched_seconds) / f64::from(total_seconds) * 100.0).round();
    percent.clamp(0.0, 100.0) as u8
}

/// Client-side completion rule for a single tick.
pub fn tick_is_completed(watched_seconds: u32, total_seconds: u32) -> bool {
    total_seconds > 0
        && f64::from(watched_seconds) / f64::from(total_seconds) >= COMPLETION_THRESHOLD_RATIO
}

/// Server-side completion rule: explicit flag or the percent threshold.
pub fn record_is_completed(percent_complete: u8, explicitly_completed: bool) -> bool {
    explicitly_completed || percent_complete >= COMPLETION_THRESHOLD_PERCENT
}

/// Progress record held by the remote authority.
///
/// Unique per `(user_id, video_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub video_id: String,
    pub playlist_id: String,
    pub watched_seconds: u32,
    pub total_seconds: u32,
    pub percent_complete: u8,
    pub is_completed: bool,
    pub last_watched_at: DateTime<Utc>,
    #[serde(default)]
    pub synced_from_offline: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /api/progress`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    pub video_id: String,
    pub playlist_id: String,
    pub watched_seconds: u32,
    pub total_seconds: u32,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub synced_from_offline: bool,
}

impl ProgressUpdate {
    /// Reject payloads the recorder would never produce.
    pub fn validate(&self) -> Result<(), SharedError> {
        validate_fields(
            &self.video_id,
            &self.playlist_id,
            self.watched_seconds,
            self.total_seconds,
        )
    }
}

/// One item of a batch sync request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncItem {
    pub video_id: String,
    pub playlist_id: String,
    pub watched_seconds: u32,
    pub total_seconds: u32,
    pub last_watched_at: DateTime<Utc>,
    #[serde(default = "default_true")]
    pub synced_from_offline: bool,
}

impl SyncItem {
    pub fn validate(&self) -> Result<(), SharedError> {
        validate_fields(
            &self.video_id,
            &self.playlist_id,
            self.watched_seconds,
            self.total_seconds,
        )
    }
}

fn default_true() -> bool {
    true
}

/// Body of `POST /api/progress/sync`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    pub progress_data: Vec<SyncItem>,
}

/// Envelope used by every progress endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data,
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data,
        }
    }
}

/// Error body returned by the progress endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn validate_fields(
    video_id: &str,
    playlist_id: &str,
    watched_seconds: u32,
    total_seconds: u32,
) -> Result<(), SharedError> {
    if video_id.trim().is_empty() {
        return Err(SharedError::validation("videoId", "videoId is required"));
    }
    if playlist_id.trim().is_empty() {
        return Err(SharedError::validation("playlistId", "playlistId is required"));
    }
    if total_seconds > 0 && watched_seconds > total_seconds {
        return Err(SharedError::validation(
            "watchedSeconds",
            format!(
                "watchedSeconds ({}) exceeds totalSeconds ({})",
                watched_seconds, total_seconds
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_percent_complete() {
        assert_eq!(percent_complete(0, 100), 0);
        assert_eq!(percent_complete(50, 100), 50);
        assert_eq!(percent_complete(1, 3), 33);
        assert_eq!(percent_complete(2, 3), 67);
        assert_eq!(percent_complete(100, 100), 100);
    }

    #[test]
    fn test_percent_complete_zero_total() {
        assert_eq!(percent_complete(42, 0), 0);
    }

    #[test]
    fn test_percent_complete_clamped() {
        assert_eq!(percent_complete(250, 100), 100);
    }

    #[test]
    fn test_tick_completion_threshold() {
        assert!(!tick_is_completed(94, 100));
        assert!(tick_is_completed(95, 100));
        assert!(tick_is_completed(96, 100));
        assert!(!tick_is_completed(0, 0));
    }

    #[test]
    fn test_record_completion() {
        assert!(record_is_completed(95, false));
        assert!(!record_is_completed(94, false));
        assert!(record_is_completed(10, true));
    }

    #[test]
    fn test_update_wire_format() {
        let update = ProgressUpdate {
            video_id: "v1".to_string(),
            playlist_id: "p1".to_string(),
            watched_seconds: 30,
            total_seconds: 100,
            is_completed: false,
            synced_from_offline: false,
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["videoId"], "v1");
        assert_eq!(json["playlistId"], "p1");
        assert_eq!(json["watchedSeconds"], 30);
        assert_eq!(json["totalSeconds"], 100);
        assert_eq!(json["isCompleted"], false);
    }

    #[test]
    fn test_sync_request_wire_format() {
        let json = serde_json::json!({
            "progressData": [{
                "videoId": "v1",
                "playlistId": "p1",
                "watchedSeconds": 5,
                "totalSeconds": 100,
                "lastWatchedAt": "2024-01-01T10:00:00Z"
            }]
        });
        let request: SyncRequest = serde_json::from_value(json).unwrap();
        assert_eq!(request.progress_data.len(), 1);
        assert!(request.progress_data[0].synced_from_offline);
    }

    #[test]
    fn test_validation() {
        let mut update = ProgressUpdate {
            video_id: "v1".to_string(),
            playlist_id: "p1".to_string(),
            watched_seconds: 120,
            total_seconds: 100,
            is_completed: false,
            synced_from_offline: false,
        };
        assert!(update.validate().is_err());

        update.watched_seconds = 100;
        assert!(update.validate().is_ok());

        update.total_seconds = 0;
        assert!(update.validate().is_ok());

        update.video_id = "  ".to_string();
        match update.validate() {
            Err(SharedError::ValidationError { field, .. }) => assert_eq!(field, "videoId"),
            other => panic!("Expected ValidationError, got {:?}", other),
        }
    }

    #[test]
    fn test_api_response_omits_empty_message() {
        let response = ApiResponse::ok(1u32);
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("message").is_none());
        assert_eq!(json["success"], true);
    }
}
