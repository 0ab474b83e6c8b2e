//! ABOUTME: Platform API client for live broadcast, stream and video lookups
//! ABOUTME: Wraps the YouTube Data API v3 calls the poll cycle depends on

use async_trait::async_trait;
use lg_core::{Credential, Result};

pub mod models;
pub mod youtube;

pub use models::{BoundBroadcast, BroadcastSnapshot, StreamState, VideoLiveDetails};
pub use youtube::YouTubeClient;

/// Outbound calls the poll cycle makes against the platform
///
/// Implementations do not retry; a failed call surfaces as `Error::Upstream`.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// The broadcast currently marked active for the authorized account, if any
    async fn fetch_active_broadcast(
        &self,
        credential: &Credential,
    ) -> Result<Option<BroadcastSnapshot>>;

    /// Status and health of the stream bound to `broadcast`
    async fn fetch_stream_state(
        &self,
        credential: &Credential,
        broadcast: &BoundBroadcast,
    ) -> Result<StreamState>;

    /// Viewer count and start time of the video behind `broadcast`
    async fn fetch_video_live_details(
        &self,
        credential: &Credential,
        broadcast: &BoundBroadcast,
    ) -> Result<VideoLiveDetails>;
}
