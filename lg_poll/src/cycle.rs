//! ABOUTME: One poll of the platform, reconciled into the metric registry
//! ABOUTME: Branches on no-broadcast, fans out the dependent lookups, logs failures

use chrono::{DateTime, Utc};
use lg_api::{BroadcastSnapshot, StreamState, UpstreamClient, VideoLiveDetails};
use lg_auth::CredentialProvider;
use lg_core::{seconds_since, unix_seconds, utc_now, CycleId, Error, MonotonicTimer, Result};
use lg_obs::{MetricName, MetricRegistry};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::mapper::{map_health_status, map_stream_status};

/// Default bound on each upstream call made during a cycle
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// How a poll cycle ended
#[derive(Debug)]
pub enum CycleOutcome {
    /// No credential yet; nothing was written
    NotAuthorized,
    /// Nothing live; the zeroed metrics were written
    NoActiveBroadcast,
    /// Live broadcast metrics were written
    Updated,
    /// An upstream call failed; writes made before the failure are kept
    Aborted(Error),
}

impl CycleOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleOutcome::NotAuthorized => "not_authorized",
            CycleOutcome::NoActiveBroadcast => "no_active_broadcast",
            CycleOutcome::Updated => "updated",
            CycleOutcome::Aborted(_) => "aborted",
        }
    }

    /// Whether the cycle reached the platform and reconciled every metric
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            CycleOutcome::NoActiveBroadcast | CycleOutcome::Updated
        )
    }
}

/// Scheduled unit of work: fetch broadcast state and publish it as gauges
pub struct PollCycle {
    credentials: Arc<dyn CredentialProvider>,
    client: Arc<dyn UpstreamClient>,
    metrics: Arc<MetricRegistry>,
    call_timeout: Duration,
}

impl PollCycle {
    pub fn new(
        credentials: Arc<dyn CredentialProvider>,
        client: Arc<dyn UpstreamClient>,
        metrics: Arc<MetricRegistry>,
    ) -> Self {
        Self {
            credentials,
            client,
            metrics,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn metrics(&self) -> &Arc<MetricRegistry> {
        &self.metrics
    }

    /// Run one cycle; failures are logged and reported, never propagated
    pub async fn run_cycle(&self) -> CycleOutcome {
        let cycle_id = CycleId::new();
        let span = info_span!(
            "poll_cycle",
            cycle_id = %cycle_id,
            started_at = %cycle_id.started_at().to_rfc3339()
        );

        async {
            let timer = MonotonicTimer::new();
            self.metrics.inc_poll_cycles();

            let outcome = match self.poll().await {
                Ok(outcome) => outcome,
                Err(Error::NotAuthorized) => {
                    debug!("Not authorized yet, skipping poll cycle");
                    CycleOutcome::NotAuthorized
                }
                Err(e) => {
                    error!(error = %e, "Poll cycle aborted");
                    self.metrics.inc_poll_errors();
                    CycleOutcome::Aborted(e)
                }
            };

            if outcome.is_success() {
                self.metrics
                    .set(MetricName::LastSuccessfulPollTimestamp, unix_seconds(utc_now()));
            }

            debug!(
                outcome = outcome.as_str(),
                elapsed_ms = timer.elapsed().as_millis() as u64,
                "Poll cycle finished"
            );
            outcome
        }
        .instrument(span)
        .await
    }

    async fn poll(&self) -> Result<CycleOutcome> {
        let credential = self
            .credentials
            .credential()
            .await
            .ok_or(Error::NotAuthorized)?;

        let snapshot = self
            .bounded(
                "liveBroadcasts.list",
                self.client.fetch_active_broadcast(&credential),
            )
            .await?;

        let Some(broadcast) = snapshot.as_ref().and_then(BroadcastSnapshot::bound) else {
            info!(
                broadcast_id = snapshot.as_ref().map(|s| s.broadcast_id.as_str()),
                "No active broadcast with a bound stream"
            );
            self.write_offline();
            return Ok(CycleOutcome::NoActiveBroadcast);
        };

        debug!(
            video_id = %broadcast.video_id,
            stream_id = %broadcast.stream_id,
            "Active broadcast found"
        );

        let (state, details) = tokio::join!(
            self.bounded(
                "liveStreams.list",
                self.client.fetch_stream_state(&credential, &broadcast)
            ),
            self.bounded(
                "videos.list",
                self.client.fetch_video_live_details(&credential, &broadcast)
            ),
        );

        // Stream state is applied first; a video failure leaves it in place
        self.write_stream_state(&state?);
        self.write_live_details(&details?, utc_now());

        Ok(CycleOutcome::Updated)
    }

    /// Apply the call timeout; an elapsed timer counts as an upstream failure
    async fn bounded<T>(
        &self,
        call: &'static str,
        request: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.call_timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(Error::upstream(
                call,
                format!("timed out after {:?}", self.call_timeout),
            )),
        }
    }

    fn write_offline(&self) {
        self.metrics.set(MetricName::StreamStatus, 0.0);
        self.metrics.set(MetricName::HealthStatus, 0.0);
        self.metrics.set(MetricName::ConcurrentViewers, 0.0);
        self.metrics.set(MetricName::UptimeSeconds, 0.0);
    }

    fn write_stream_state(&self, state: &StreamState) {
        match map_stream_status(&state.stream_status) {
            Ok(value) => self.metrics.set(MetricName::StreamStatus, f64::from(value)),
            Err(e) => warn!(error = %e, "Keeping previous streamStatus"),
        }

        match map_health_status(&state.health_status) {
            Ok(value) => self.metrics.set(MetricName::HealthStatus, f64::from(value)),
            Err(e) => warn!(error = %e, "Keeping previous healthStatus"),
        }
    }

    fn write_live_details(&self, details: &VideoLiveDetails, now: DateTime<Utc>) {
        let uptime = details
            .actual_start_time
            .map(|started| seconds_since(started, now))
            .unwrap_or(0);
        self.metrics.set(MetricName::UptimeSeconds, uptime as f64);

        let viewers = details.concurrent_viewers.unwrap_or(0);
        self.metrics
            .set(MetricName::ConcurrentViewers, viewers as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockUpstream, Reply};
    use chrono::Duration as ChronoDuration;
    use lg_auth::StaticCredentialProvider;
    use lg_core::Credential;

    fn authorized() -> Arc<dyn CredentialProvider> {
        Arc::new(StaticCredentialProvider::new(Some(Credential::new("token"))))
    }

    fn cycle_with(upstream: Arc<MockUpstream>) -> PollCycle {
        PollCycle::new(authorized(), upstream, Arc::new(MetricRegistry::new()))
    }

    fn value(cycle: &PollCycle, name: MetricName) -> f64 {
        cycle.metrics().get(name)
    }

    #[tokio::test]
    async fn test_live_broadcast_scenario() {
        let started = Utc::now() - ChronoDuration::seconds(120);
        let upstream = Arc::new(MockUpstream::live("active", "good", Some(42), Some(started)));
        let cycle = cycle_with(upstream);

        let outcome = cycle.run_cycle().await;

        assert!(matches!(outcome, CycleOutcome::Updated));
        assert_eq!(value(&cycle, MetricName::StreamStatus), 4.0);
        assert_eq!(value(&cycle, MetricName::HealthStatus), 3.0);
        assert_eq!(value(&cycle, MetricName::ConcurrentViewers), 42.0);
        let uptime = value(&cycle, MetricName::UptimeSeconds);
        assert!((120.0..=125.0).contains(&uptime), "uptime was {}", uptime);
        assert!(value(&cycle, MetricName::LastSuccessfulPollTimestamp) > 0.0);
    }

    #[tokio::test]
    async fn test_uptime_one_hour() {
        let started = Utc::now() - ChronoDuration::seconds(3600);
        let upstream = Arc::new(MockUpstream::live("active", "ok", Some(1), Some(started)));
        let cycle = cycle_with(upstream);

        cycle.run_cycle().await;

        let uptime = value(&cycle, MetricName::UptimeSeconds);
        assert!((3600.0..=3605.0).contains(&uptime), "uptime was {}", uptime);
    }

    #[tokio::test]
    async fn test_future_start_time_clamps_uptime() {
        let started = Utc::now() + ChronoDuration::seconds(30);
        let upstream = Arc::new(MockUpstream::live("active", "good", Some(3), Some(started)));
        let cycle = cycle_with(upstream);

        cycle.run_cycle().await;

        assert_eq!(value(&cycle, MetricName::UptimeSeconds), 0.0);
    }

    #[tokio::test]
    async fn test_missing_viewers_written_as_zero() {
        let started = Utc::now() - ChronoDuration::seconds(10);
        let upstream = Arc::new(MockUpstream::live("ready", "ok", None, Some(started)));
        let cycle = cycle_with(upstream);
        cycle.metrics().set(MetricName::ConcurrentViewers, 17.0);

        let outcome = cycle.run_cycle().await;

        assert!(matches!(outcome, CycleOutcome::Updated));
        assert_eq!(value(&cycle, MetricName::ConcurrentViewers), 0.0);
        assert_eq!(value(&cycle, MetricName::StreamStatus), 3.0);
    }

    #[tokio::test]
    async fn test_no_active_broadcast_zeroes_metrics() {
        let upstream = Arc::new(MockUpstream::offline());
        let cycle = cycle_with(upstream.clone());
        cycle.metrics().set(MetricName::StreamStatus, 4.0);
        cycle.metrics().set(MetricName::HealthStatus, 3.0);
        cycle.metrics().set(MetricName::ConcurrentViewers, 42.0);
        cycle.metrics().set(MetricName::UptimeSeconds, 500.0);

        let outcome = cycle.run_cycle().await;

        assert!(matches!(outcome, CycleOutcome::NoActiveBroadcast));
        assert_eq!(value(&cycle, MetricName::StreamStatus), 0.0);
        assert_eq!(value(&cycle, MetricName::HealthStatus), 0.0);
        assert_eq!(value(&cycle, MetricName::ConcurrentViewers), 0.0);
        assert_eq!(value(&cycle, MetricName::UptimeSeconds), 0.0);
        // Only the broadcast lookup ran
        assert_eq!(upstream.calls(), 1);
    }

    #[tokio::test]
    async fn test_unbound_broadcast_is_treated_as_offline() {
        let upstream = Arc::new(MockUpstream::live("active", "good", Some(5), None));
        upstream.set_broadcast(Reply::Ok(Some(BroadcastSnapshot {
            broadcast_id: "bc-1".to_string(),
            bound_stream_id: None,
        })));
        let cycle = cycle_with(upstream.clone());

        let outcome = cycle.run_cycle().await;

        assert!(matches!(outcome, CycleOutcome::NoActiveBroadcast));
        assert_eq!(value(&cycle, MetricName::StreamStatus), 0.0);
        assert_eq!(upstream.calls(), 1);
    }

    #[tokio::test]
    async fn test_not_authorized_skips_cycle() {
        let upstream = Arc::new(MockUpstream::live("active", "good", Some(42), None));
        let metrics = Arc::new(MetricRegistry::new());
        metrics.set(MetricName::StreamStatus, 2.0);
        let cycle = PollCycle::new(
            Arc::new(StaticCredentialProvider::new(None)),
            upstream.clone(),
            metrics.clone(),
        );

        let outcome = cycle.run_cycle().await;

        assert!(matches!(outcome, CycleOutcome::NotAuthorized));
        assert_eq!(upstream.calls(), 0);
        assert_eq!(metrics.get(MetricName::StreamStatus), 2.0);
        assert_eq!(metrics.get(MetricName::LastSuccessfulPollTimestamp), 0.0);
        assert_eq!(metrics.poll_errors(), 0);
    }

    #[tokio::test]
    async fn test_video_failure_keeps_stream_state_writes() {
        let started = Utc::now() - ChronoDuration::seconds(60);
        let upstream = Arc::new(MockUpstream::live("active", "good", Some(42), Some(started)));
        let cycle = cycle_with(upstream.clone());
        cycle.run_cycle().await;

        // Next cycle: stream degrades, video lookup fails
        upstream.set_stream(Reply::Ok(StreamState {
            stream_status: "error".to_string(),
            health_status: "bad".to_string(),
        }));
        upstream.set_video(Reply::Fail("HTTP 500: backend error"));
        let uptime_before = value(&cycle, MetricName::UptimeSeconds);

        let outcome = cycle.run_cycle().await;

        match outcome {
            CycleOutcome::Aborted(e) => assert!(e.to_string().contains("videos.list")),
            other => panic!("expected Aborted, got {:?}", other),
        }
        assert_eq!(value(&cycle, MetricName::StreamStatus), 1.0);
        assert_eq!(value(&cycle, MetricName::HealthStatus), 1.0);
        assert_eq!(value(&cycle, MetricName::ConcurrentViewers), 42.0);
        assert_eq!(value(&cycle, MetricName::UptimeSeconds), uptime_before);
        assert_eq!(cycle.metrics().poll_errors(), 1);
        assert_eq!(cycle.metrics().poll_cycles(), 2);
    }

    #[tokio::test]
    async fn test_stream_failure_writes_nothing() {
        let upstream = Arc::new(MockUpstream::live("active", "good", Some(42), None));
        upstream.set_stream(Reply::Fail("no status for stream st-1"));
        let cycle = cycle_with(upstream);

        let outcome = cycle.run_cycle().await;

        assert!(matches!(outcome, CycleOutcome::Aborted(_)));
        assert_eq!(value(&cycle, MetricName::StreamStatus), 0.0);
        assert_eq!(value(&cycle, MetricName::ConcurrentViewers), 0.0);
        assert_eq!(value(&cycle, MetricName::LastSuccessfulPollTimestamp), 0.0);
    }

    #[tokio::test]
    async fn test_broadcast_failure_keeps_previous_values() {
        let upstream = Arc::new(MockUpstream::live("active", "good", Some(42), None));
        let cycle = cycle_with(upstream.clone());
        cycle.run_cycle().await;
        let before = cycle.metrics().snapshot();

        upstream.set_broadcast(Reply::Fail("HTTP 401: Invalid Credentials"));
        let outcome = cycle.run_cycle().await;

        assert!(matches!(outcome, CycleOutcome::Aborted(Error::Upstream(_))));
        assert_eq!(cycle.metrics().snapshot(), before);
    }

    #[tokio::test]
    async fn test_unknown_status_leaves_metric_unchanged() {
        let upstream = Arc::new(MockUpstream::live("active", "good", Some(42), None));
        let cycle = cycle_with(upstream.clone());
        cycle.run_cycle().await;
        assert_eq!(value(&cycle, MetricName::StreamStatus), 4.0);

        upstream.set_stream(Reply::Ok(StreamState {
            stream_status: "liveish".to_string(),
            health_status: "ok".to_string(),
        }));
        upstream.set_video(Reply::Ok(VideoLiveDetails {
            concurrent_viewers: Some(50),
            actual_start_time: None,
        }));

        let outcome = cycle.run_cycle().await;

        // The rest of the cycle still runs
        assert!(matches!(outcome, CycleOutcome::Updated));
        assert_eq!(value(&cycle, MetricName::StreamStatus), 4.0);
        assert_eq!(value(&cycle, MetricName::HealthStatus), 2.0);
        assert_eq!(value(&cycle, MetricName::ConcurrentViewers), 50.0);
    }

    #[tokio::test]
    async fn test_cycle_is_idempotent() {
        let started = Utc::now() - ChronoDuration::seconds(600);
        let upstream = Arc::new(MockUpstream::live("active", "good", Some(42), Some(started)));
        let cycle = cycle_with(upstream);

        let core = [
            MetricName::StreamStatus,
            MetricName::HealthStatus,
            MetricName::ConcurrentViewers,
        ];

        cycle.run_cycle().await;
        let first: Vec<f64> = core.iter().map(|n| value(&cycle, *n)).collect();
        let first_uptime = value(&cycle, MetricName::UptimeSeconds);

        cycle.run_cycle().await;
        let second: Vec<f64> = core.iter().map(|n| value(&cycle, *n)).collect();
        let second_uptime = value(&cycle, MetricName::UptimeSeconds);

        assert_eq!(first, second);
        // Uptime is wall-clock derived; identical up to test execution time
        assert!((second_uptime - first_uptime).abs() <= 1.0);
    }

    #[tokio::test]
    async fn test_slow_upstream_times_out() {
        let upstream = Arc::new(MockUpstream::live("active", "good", Some(42), None));
        upstream.set_video(Reply::Slow(
            Duration::from_secs(5),
            VideoLiveDetails::default(),
        ));
        let cycle = cycle_with(upstream).with_call_timeout(Duration::from_millis(50));

        let outcome = cycle.run_cycle().await;

        match outcome {
            CycleOutcome::Aborted(e) => {
                assert!(e.is_upstream());
                assert!(e.to_string().contains("timed out"));
            }
            other => panic!("expected Aborted, got {:?}", other),
        }
        // Stream state arrived in time and was applied
        assert_eq!(value(&cycle, MetricName::StreamStatus), 4.0);
    }
}
