//! ABOUTME: Shared testing utilities and helper functions
//! ABOUTME: Canned platform API and OAuth payloads for all crates

use serde_json::{json, Value};

/// Broadcast id used across fixtures; doubles as the video id
pub const BROADCAST_ID: &str = "bc-7f3a9q";

/// Bound stream id used across fixtures
pub const STREAM_ID: &str = "st-Qx81Lm";

/// A list response with no items, as returned when nothing is live
pub fn empty_list() -> Value {
    json!({
        "kind": "youtube#liveBroadcastListResponse",
        "pageInfo": { "totalResults": 0, "resultsPerPage": 5 },
        "items": []
    })
}

/// liveBroadcasts.list response with one active broadcast
pub fn broadcast_list(broadcast_id: &str, bound_stream_id: Option<&str>) -> Value {
    let mut content_details = json!({
        "enableAutoStart": true,
        "recordFromStart": true
    });
    if let Some(stream_id) = bound_stream_id {
        content_details["boundStreamId"] = json!(stream_id);
    }

    json!({
        "kind": "youtube#liveBroadcastListResponse",
        "pageInfo": { "totalResults": 1, "resultsPerPage": 5 },
        "items": [{
            "kind": "youtube#liveBroadcast",
            "id": broadcast_id,
            "snippet": { "title": "Sunday service" },
            "contentDetails": content_details,
            "status": { "lifeCycleStatus": "live", "privacyStatus": "public" }
        }]
    })
}

/// liveStreams.list response for a single stream
pub fn stream_list(stream_id: &str, stream_status: &str, health_status: Option<&str>) -> Value {
    let mut status = json!({ "streamStatus": stream_status });
    if let Some(health) = health_status {
        status["healthStatus"] = json!({ "status": health, "configurationIssues": [] });
    }

    json!({
        "kind": "youtube#liveStreamListResponse",
        "items": [{
            "kind": "youtube#liveStream",
            "id": stream_id,
            "status": status
        }]
    })
}

/// videos.list response carrying live streaming details
///
/// The platform sends `concurrentViewers` as a decimal string.
pub fn video_list(video_id: &str, concurrent_viewers: Option<&str>, actual_start_time: Option<&str>) -> Value {
    let mut details = json!({});
    if let Some(viewers) = concurrent_viewers {
        details["concurrentViewers"] = json!(viewers);
    }
    if let Some(start) = actual_start_time {
        details["actualStartTime"] = json!(start);
    }

    json!({
        "kind": "youtube#videoListResponse",
        "items": [{
            "kind": "youtube#video",
            "id": video_id,
            "liveStreamingDetails": details
        }]
    })
}

/// Error body in the platform's format
pub fn api_error(code: u16, reason: &str, message: &str) -> Value {
    json!({
        "error": {
            "code": code,
            "message": message,
            "errors": [{ "reason": reason, "message": message, "domain": "youtube.quota" }]
        }
    })
}

/// OAuth token endpoint response
pub fn token_response(access_token: &str, refresh_token: Option<&str>, expires_in: i64) -> Value {
    let mut body = json!({
        "access_token": access_token,
        "expires_in": expires_in,
        "token_type": "Bearer",
        "scope": "https://www.googleapis.com/auth/youtube.readonly"
    });
    if let Some(refresh) = refresh_token {
        body["refresh_token"] = json!(refresh);
    }
    body
}
