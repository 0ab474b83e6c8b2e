//! ABOUTME: Snapshot types returned by the platform client
//! ABOUTME: Plus the wire structures they are decoded from

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

/// Active broadcast as seen at the start of a poll cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastSnapshot {
    pub broadcast_id: String,
    pub bound_stream_id: Option<String>,
}

impl BroadcastSnapshot {
    /// The ids the dependent lookups need, present only when a stream is bound
    pub fn bound(&self) -> Option<BoundBroadcast> {
        self.bound_stream_id
            .as_ref()
            .filter(|id| !id.is_empty())
            .map(|stream_id| BoundBroadcast {
                video_id: self.broadcast_id.clone(),
                stream_id: stream_id.clone(),
            })
    }
}

/// A broadcast with a bound ingest stream
///
/// The platform uses the broadcast id as the id of the backing video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundBroadcast {
    pub video_id: String,
    pub stream_id: String,
}

/// Raw status strings of the bound stream; mapping happens in the poll cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamState {
    pub stream_status: String,
    pub health_status: String,
}

/// Live details of the broadcast's video
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VideoLiveDetails {
    /// Absent until the platform starts reporting viewers
    pub concurrent_viewers: Option<u64>,
    pub actual_start_time: Option<DateTime<Utc>>,
}

/// Health reported when the platform omits the health object
pub const NO_DATA_HEALTH: &str = "noData";

#[derive(Debug, Deserialize)]
pub(crate) struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LiveBroadcastItem {
    pub id: String,
    #[serde(default)]
    pub content_details: Option<BroadcastContentDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BroadcastContentDetails {
    #[serde(default)]
    pub bound_stream_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LiveStreamItem {
    #[serde(default)]
    pub status: Option<LiveStreamStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LiveStreamStatus {
    pub stream_status: String,
    #[serde(default)]
    pub health_status: Option<LiveStreamHealth>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LiveStreamHealth {
    pub status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VideoItem {
    #[serde(default)]
    pub live_streaming_details: Option<LiveStreamingDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LiveStreamingDetails {
    #[serde(default)]
    pub concurrent_viewers: Option<Value>,
    #[serde(default)]
    pub actual_start_time: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorDetail {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub errors: Vec<ApiErrorReason>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorReason {
    #[serde(default)]
    pub reason: String,
}

impl From<LiveBroadcastItem> for BroadcastSnapshot {
    fn from(item: LiveBroadcastItem) -> Self {
        Self {
            broadcast_id: item.id,
            bound_stream_id: item.content_details.and_then(|d| d.bound_stream_id),
        }
    }
}

impl From<LiveStreamStatus> for StreamState {
    fn from(status: LiveStreamStatus) -> Self {
        Self {
            stream_status: status.stream_status,
            health_status: status
                .health_status
                .map(|h| h.status)
                .unwrap_or_else(|| NO_DATA_HEALTH.to_string()),
        }
    }
}

impl From<LiveStreamingDetails> for VideoLiveDetails {
    fn from(details: LiveStreamingDetails) -> Self {
        Self {
            concurrent_viewers: details.concurrent_viewers.as_ref().and_then(parse_viewers),
            actual_start_time: details.actual_start_time.as_deref().and_then(parse_start_time),
        }
    }
}

/// Viewer counts arrive as decimal strings; anything unparseable is treated as absent
fn parse_viewers(value: &Value) -> Option<u64> {
    let parsed = match value {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_u64(),
        Value::Null => return None,
        _ => None,
    };

    if parsed.is_none() {
        warn!(value = %value, "Ignoring unparseable concurrentViewers");
    }
    parsed
}

fn parse_start_time(raw: &str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(time) => Some(time.with_timezone(&Utc)),
        Err(e) => {
            warn!(value = %raw, error = %e, "Ignoring unparseable actualStartTime");
            None
        }
    }
}
