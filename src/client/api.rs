//! Progress API Client
//!
//! HTTP client for the `/api/progress` endpoints. Every request carries the
//! bearer token and is bounded by the configured request timeout.
//!
//! The [`RemoteAuthority`] trait is the seam the recorder and reconciler
//! depend on, so they can be driven by a fake in tests.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

use crate::client::config::Config;
use crate::shared::progress::{
    ApiResponse, ErrorResponse, ProgressRecord, ProgressUpdate, SyncItem, SyncRequest,
};

/// Failures talking to the server. All of them are transient from the
/// point of view of offline sync.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ApiError {
    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("not authenticated")]
    Unauthorized,

    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("request rejected: {message}")]
    Rejected { message: String },

    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// Server-side progress store
#[async_trait]
pub trait RemoteAuthority: Send + Sync {
    /// Upsert one record for the current user
    async fn upsert_progress(&self, update: &ProgressUpdate) -> Result<ProgressRecord, ApiError>;

    /// Submit a batch of offline entries in one request
    async fn sync_progress(&self, items: &[SyncItem]) -> Result<Vec<ProgressRecord>, ApiError>;

    async fn playlist_progress(&self, playlist_id: &str) -> Result<Vec<ProgressRecord>, ApiError>;

    async fn all_progress(&self) -> Result<Vec<ProgressRecord>, ApiError>;
}

/// Progress API client
#[derive(Debug)]
pub struct ProgressApiClient {
    config: Config,
    client: Client,
    token: RwLock<Option<String>>,
}

impl ProgressApiClient {
    pub fn new(config: Config) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ApiError::Network(format!("Failed to build HTTP client: {}", e)))?;
        let token = RwLock::new(config.get_token().map(str::to_owned));

        Ok(Self {
            config,
            client,
            token,
        })
    }

    pub async fn set_token(&self, token: Option<String>) {
        *self.token.write().await = token;
    }

    pub async fn has_token(&self) -> bool {
        self.token.read().await.is_some()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<ApiResponse<T>, ApiError> {
        // Without a token the server would answer 401 anyway
        let token = self.token.read().await.clone().ok_or(ApiError::Unauthorized)?;

        let response = request.bearer_auth(token).send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.message)
                .unwrap_or_else(|_| if body.is_empty() { status.to_string() } else { body });
            return Err(ApiError::Server {
                status: status.as_u16(),
                message,
            });
        }

        let body: serde_json::Value = response.json().await?;
        if body.get("success").and_then(serde_json::Value::as_bool) != Some(true) {
            let message = body
                .get("message")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("server reported failure")
                .to_string();
            return Err(ApiError::Rejected { message });
        }

        serde_json::from_value(body).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[async_trait]
impl RemoteAuthority for ProgressApiClient {
    async fn upsert_progress(&self, update: &ProgressUpdate) -> Result<ProgressRecord, ApiError> {
        let url = self.config.api_url("/api/progress");
        let response: ApiResponse<ProgressRecord> =
            self.send(self.client.post(&url).json(update)).await?;
        Ok(response.data)
    }

    async fn sync_progress(&self, items: &[SyncItem]) -> Result<Vec<ProgressRecord>, ApiError> {
        let url = self.config.api_url("/api/progress/sync");
        let request = SyncRequest {
            progress_data: items.to_vec(),
        };
        let response: ApiResponse<Vec<ProgressRecord>> =
            self.send(self.client.post(&url).json(&request)).await?;
        if let Some(message) = &response.message {
            debug!("Sync response: {}", message);
        }
        Ok(response.data)
    }

    async fn playlist_progress(&self, playlist_id: &str) -> Result<Vec<ProgressRecord>, ApiError> {
        let mut url = Url::parse(&self.config.api_url("/api/progress/playlist"))
            .map_err(|e| ApiError::Network(format!("Invalid server URL: {}", e)))?;
        // Pushed as one segment so ids containing '/' or '?' stay in the path
        url.path_segments_mut()
            .map_err(|_| ApiError::Network("Server URL cannot carry a path".to_string()))?
            .push(playlist_id);
        let response: ApiResponse<Vec<ProgressRecord>> = self.send(self.client.get(url)).await?;
        Ok(response.data)
    }

    async fn all_progress(&self) -> Result<Vec<ProgressRecord>, ApiError> {
        let url = self.config.api_url("/api/progress");
        let response: ApiResponse<Vec<ProgressRecord>> = self.send(self.client.get(&url)).await?;
        Ok(response.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::config::AppConfig;
    use assert_matches::assert_matches;
    use chrono::Utc;
    use std::time::Duration;
    use uuid::Uuid;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, token: Option<&str>) -> ProgressApiClient {
        let mut config = Config::with_builder(
            AppConfig::builder()
                .server_url(server.uri())
                .request_timeout(Duration::from_secs(1)),
        )
        .unwrap();
        config.set_token(token.map(str::to_owned));
        ProgressApiClient::new(config).unwrap()
    }

    fn record_json(video: &str, watched: u32) -> serde_json::Value {
        let now = Utc::now();
        serde_json::to_value(ProgressRecord {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            video_id: video.to_string(),
            playlist_id: "p1".to_string(),
            watched_seconds: watched,
            total_seconds: 100,
            percent_complete: watched as u8,
            is_completed: false,
            last_watched_at: now,
            synced_from_offline: false,
            created_at: now,
            updated_at: now,
        })
        .unwrap()
    }

    fn update() -> ProgressUpdate {
        ProgressUpdate {
            video_id: "v1".to_string(),
            playlist_id: "p1".to_string(),
            watched_seconds: 30,
            total_seconds: 100,
            is_completed: false,
            synced_from_offline: false,
        }
    }

    #[tokio::test]
    async fn test_upsert_sends_bearer_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/progress"))
            .and(header("authorization", "Bearer secret"))
            .and(body_partial_json(serde_json::json!({ "videoId": "v1", "watchedSeconds": 30 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "data": record_json("v1", 30),
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("secret"));
        let record = client.upsert_progress(&update()).await.unwrap();
        assert_eq!(record.video_id, "v1");
        assert_eq!(record.watched_seconds, 30);
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        assert_matches!(client.upsert_progress(&update()).await, Err(ApiError::Unauthorized));
    }

    #[tokio::test]
    async fn test_401_maps_to_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "success": false,
                "message": "Invalid token",
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, Some("expired"));
        assert_matches!(client.upsert_progress(&update()).await, Err(ApiError::Unauthorized));
    }

    #[tokio::test]
    async fn test_server_error_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_json(serde_json::json!({
                "success": false,
                "message": "Database unavailable",
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, Some("secret"));
        let err = client.upsert_progress(&update()).await.unwrap_err();
        assert_eq!(
            err,
            ApiError::Server {
                status: 503,
                message: "Database unavailable".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_success_false_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/progress/sync"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": false,
                "message": "Error syncing progress",
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, Some("secret"));
        let err = client.sync_progress(&[]).await.unwrap_err();
        assert_matches!(err, ApiError::Rejected { message } if message == "Error syncing progress");
    }

    #[tokio::test]
    async fn test_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_secs(3))
                    .set_body_json(serde_json::json!({ "success": true, "data": record_json("v1", 1) })),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, Some("secret"));
        assert_matches!(client.upsert_progress(&update()).await, Err(ApiError::Timeout));
    }

    #[tokio::test]
    async fn test_sync_posts_progress_data() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/progress/sync"))
            .and(body_partial_json(serde_json::json!({
                "progressData": [{ "videoId": "v1", "syncedFromOffline": true }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "message": "Synced 1 progress records",
                "data": [record_json("v1", 10)],
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("secret"));
        let items = vec![SyncItem {
            video_id: "v1".to_string(),
            playlist_id: "p1".to_string(),
            watched_seconds: 10,
            total_seconds: 100,
            last_watched_at: Utc::now(),
            synced_from_offline: true,
        }];
        let records = client.sync_progress(&items).await.unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_playlist_progress() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/progress/playlist/p1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "data": [record_json("v1", 10), record_json("v2", 20)],
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, Some("secret"));
        let records = client.playlist_progress("p1").await.unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn test_playlist_id_is_escaped_as_one_segment() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/progress/playlist/course%2F1%3Fpart"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "data": [record_json("v1", 10)],
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("secret"));
        let records = client.playlist_progress("course/1?part").await.unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_set_token_after_construction() {
        let server = MockServer::start().await;
        let client = client_for(&server, None);
        assert!(!client.has_token().await);
        client.set_token(Some("later".to_string())).await;
        assert!(client.has_token().await);
    }
}
