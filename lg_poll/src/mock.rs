//! Scriptable platform client for poll cycle tests

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lg_api::{BoundBroadcast, BroadcastSnapshot, StreamState, UpstreamClient, VideoLiveDetails};
use lg_core::{Credential, Error, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Canned reply for one endpoint
#[derive(Debug, Clone)]
pub enum Reply<T> {
    Ok(T),
    Fail(&'static str),
    Slow(Duration, T),
}

impl<T: Clone> Reply<T> {
    async fn resolve(&self, call: &'static str) -> Result<T> {
        match self {
            Reply::Ok(value) => Ok(value.clone()),
            Reply::Fail(message) => Err(Error::upstream(call, message)),
            Reply::Slow(delay, value) => {
                tokio::time::sleep(*delay).await;
                Ok(value.clone())
            }
        }
    }
}

pub struct MockUpstream {
    pub broadcast: Mutex<Reply<Option<BroadcastSnapshot>>>,
    pub stream: Mutex<Reply<StreamState>>,
    pub video: Mutex<Reply<VideoLiveDetails>>,
    pub calls: AtomicUsize,
}

impl MockUpstream {
    /// A live broadcast with the given statuses and details
    pub fn live(
        stream_status: &str,
        health_status: &str,
        viewers: Option<u64>,
        started: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            broadcast: Mutex::new(Reply::Ok(Some(BroadcastSnapshot {
                broadcast_id: "bc-1".to_string(),
                bound_stream_id: Some("st-1".to_string()),
            }))),
            stream: Mutex::new(Reply::Ok(StreamState {
                stream_status: stream_status.to_string(),
                health_status: health_status.to_string(),
            })),
            video: Mutex::new(Reply::Ok(VideoLiveDetails {
                concurrent_viewers: viewers,
                actual_start_time: started,
            })),
            calls: AtomicUsize::new(0),
        }
    }

    /// Nothing is live on the account
    pub fn offline() -> Self {
        let mock = Self::live("inactive", "noData", None, None);
        *mock.broadcast.lock().unwrap() = Reply::Ok(None);
        mock
    }

    pub fn set_broadcast(&self, reply: Reply<Option<BroadcastSnapshot>>) {
        *self.broadcast.lock().unwrap() = reply;
    }

    pub fn set_stream(&self, reply: Reply<StreamState>) {
        *self.stream.lock().unwrap() = reply;
    }

    pub fn set_video(&self, reply: Reply<VideoLiveDetails>) {
        *self.video.lock().unwrap() = reply;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UpstreamClient for MockUpstream {
    async fn fetch_active_broadcast(
        &self,
        _credential: &Credential,
    ) -> Result<Option<BroadcastSnapshot>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = self.broadcast.lock().unwrap().clone();
        reply.resolve("liveBroadcasts.list").await
    }

    async fn fetch_stream_state(
        &self,
        _credential: &Credential,
        _broadcast: &BoundBroadcast,
    ) -> Result<StreamState> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = self.stream.lock().unwrap().clone();
        reply.resolve("liveStreams.list").await
    }

    async fn fetch_video_live_details(
        &self,
        _credential: &Credential,
        _broadcast: &BoundBroadcast,
    ) -> Result<VideoLiveDetails> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = self.video.lock().unwrap().clone();
        reply.resolve("videos.list").await
    }
}
