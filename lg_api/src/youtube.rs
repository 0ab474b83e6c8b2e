//! ABOUTME: YouTube Data API v3 client for live broadcast monitoring
//! ABOUTME: Handles bearer auth, timeouts, quota errors and response decoding

use async_trait::async_trait;
use lg_core::{Credential, Error, Result};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

use crate::models::{
    ApiErrorBody, BoundBroadcast, BroadcastSnapshot, ListResponse, LiveBroadcastItem,
    LiveStreamItem, StreamState, VideoItem, VideoLiveDetails,
};
use crate::UpstreamClient;

const LIST_BROADCASTS: &str = "liveBroadcasts.list";
const LIST_STREAMS: &str = "liveStreams.list";
const LIST_VIDEOS: &str = "videos.list";

/// Reasons the platform uses for quota and rate-limit rejections
const RATE_LIMIT_REASONS: [&str; 4] = [
    "quotaExceeded",
    "rateLimitExceeded",
    "userRateLimitExceeded",
    "dailyLimitExceeded",
];

/// HTTP client for the platform API
#[derive(Debug, Clone)]
pub struct YouTubeClient {
    client: Client,
    base_url: String,
}

impl YouTubeClient {
    /// Create a client whose every request is bounded by `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("livegauge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: "https://www.googleapis.com/youtube/v3".to_string(),
        })
    }

    /// Point the client at a different API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issue a list call and decode its `items`
    async fn list<T: DeserializeOwned>(
        &self,
        call: &'static str,
        resource: &str,
        credential: &Credential,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>> {
        let url = format!("{}/{}", self.base_url, resource);
        debug!(call, url = %url, "Calling platform API");

        let response = self
            .client
            .get(&url)
            .bearer_auth(credential.access_token())
            .query(query)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::upstream(call, "request timed out")
                } else {
                    Error::upstream(call, format!("request failed: {}", e))
                }
            })?;

        let response = check_status(call, response).await?;

        let body: ListResponse<T> = response
            .json()
            .await
            .map_err(|e| Error::upstream(call, format!("failed to parse response: {}", e)))?;

        debug!(call, items = body.items.len(), "Platform API call succeeded");
        Ok(body.items)
    }
}

/// Turn non-success responses into upstream errors, naming quota rejections
async fn check_status(call: &'static str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let text = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ApiErrorBody>(&text).ok().map(|b| b.error);

    let reason = detail
        .as_ref()
        .and_then(|d| d.errors.first())
        .map(|r| r.reason.as_str())
        .unwrap_or_default();

    if status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN && RATE_LIMIT_REASONS.contains(&reason))
    {
        warn!(call, %status, reason, retry_after = ?retry_after, "Platform API rate limited");
        let reason = if reason.is_empty() { "rate limited" } else { reason };
        return Err(match retry_after {
            Some(after) => Error::upstream(
                call,
                format!("rate limited ({}), retry after {}s", reason, after),
            ),
            None => Error::upstream(call, format!("rate limited ({})", reason)),
        });
    }

    let message = detail
        .map(|d| d.message)
        .filter(|m| !m.is_empty())
        .unwrap_or(text);

    Err(Error::upstream(
        call,
        format!("HTTP {}: {}", status.as_u16(), message.trim()),
    ))
}

#[async_trait]
impl UpstreamClient for YouTubeClient {
    async fn fetch_active_broadcast(
        &self,
        credential: &Credential,
    ) -> Result<Option<BroadcastSnapshot>> {
        let items: Vec<LiveBroadcastItem> = self
            .list(
                LIST_BROADCASTS,
                "liveBroadcasts",
                credential,
                &[
                    ("part", "id,contentDetails,status"),
                    ("broadcastStatus", "active"),
                    ("broadcastType", "all"),
                ],
            )
            .await?;

        if items.len() > 1 {
            debug!(count = items.len(), "Multiple active broadcasts, monitoring the first");
        }

        Ok(items.into_iter().next().map(BroadcastSnapshot::from))
    }

    async fn fetch_stream_state(
        &self,
        credential: &Credential,
        broadcast: &BoundBroadcast,
    ) -> Result<StreamState> {
        let items: Vec<LiveStreamItem> = self
            .list(
                LIST_STREAMS,
                "liveStreams",
                credential,
                &[("part", "status"), ("id", broadcast.stream_id.as_str())],
            )
            .await?;

        items
            .into_iter()
            .next()
            .and_then(|item| item.status)
            .map(StreamState::from)
            .ok_or_else(|| {
                Error::upstream(
                    LIST_STREAMS,
                    format!("no status for stream {}", broadcast.stream_id),
                )
            })
    }

    async fn fetch_video_live_details(
        &self,
        credential: &Credential,
        broadcast: &BoundBroadcast,
    ) -> Result<VideoLiveDetails> {
        let items: Vec<VideoItem> = self
            .list(
                LIST_VIDEOS,
                "videos",
                credential,
                &[
                    ("part", "liveStreamingDetails"),
                    ("id", broadcast.video_id.as_str()),
                ],
            )
            .await?;

        let item = items.into_iter().next().ok_or_else(|| {
            Error::upstream(LIST_VIDEOS, format!("video {} not found", broadcast.video_id))
        })?;

        // A video without live details has not produced any live data yet
        Ok(item
            .live_streaming_details
            .map(VideoLiveDetails::from)
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_base_url_trims_slash() {
        let client = YouTubeClient::new(Duration::from_secs(1))
            .unwrap()
            .with_base_url("http://127.0.0.1:9999/youtube/v3/");
        assert_eq!(client.base_url(), "http://127.0.0.1:9999/youtube/v3");
    }
}
