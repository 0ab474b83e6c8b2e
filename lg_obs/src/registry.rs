//! ABOUTME: Process-wide registry of broadcast gauges
//! ABOUTME: Written by the poll cycle, rendered as exposition text for scrapes

use lg_core::{Error, Result};
use prometheus_client::{
    encoding::text::encode,
    metrics::{counter::Counter, gauge::Gauge},
    registry::Registry,
};
use serde::Serialize;
use std::str::FromStr;
use std::sync::{atomic::AtomicU64, Mutex};

type FloatGauge = Gauge<f64, AtomicU64>;

/// Names of the gauges the poll cycle is allowed to write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    StreamStatus,
    HealthStatus,
    ConcurrentViewers,
    UptimeSeconds,
    LastSuccessfulPollTimestamp,
}

impl MetricName {
    pub const ALL: [MetricName; 5] = [
        MetricName::StreamStatus,
        MetricName::HealthStatus,
        MetricName::ConcurrentViewers,
        MetricName::UptimeSeconds,
        MetricName::LastSuccessfulPollTimestamp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::StreamStatus => "streamStatus",
            MetricName::HealthStatus => "healthStatus",
            MetricName::ConcurrentViewers => "concurrentViewers",
            MetricName::UptimeSeconds => "uptimeSeconds",
            MetricName::LastSuccessfulPollTimestamp => "lastSuccessfulPollTimestamp",
        }
    }

    fn help(&self) -> &'static str {
        match self {
            MetricName::StreamStatus => {
                "Bound stream status (0=inactive, 1=error, 2=created, 3=ready, 4=active)"
            }
            MetricName::HealthStatus => "Bound stream health (0=noData, 1=bad, 2=ok, 3=good)",
            MetricName::ConcurrentViewers => "Concurrent viewers of the active broadcast",
            MetricName::UptimeSeconds => "Seconds since the active broadcast started",
            MetricName::LastSuccessfulPollTimestamp => {
                "Unix time of the last poll cycle that completed without upstream errors"
            }
        }
    }

    fn index(&self) -> usize {
        match self {
            MetricName::StreamStatus => 0,
            MetricName::HealthStatus => 1,
            MetricName::ConcurrentViewers => 2,
            MetricName::UptimeSeconds => 3,
            MetricName::LastSuccessfulPollTimestamp => 4,
        }
    }
}

impl std::fmt::Display for MetricName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        MetricName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| Error::Config(format!("Unknown metric name: {}", s)))
    }
}

/// Point-in-time value of a single gauge
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSample {
    pub name: &'static str,
    pub value: f64,
}

/// Gauges for the monitored broadcast, backed by a Prometheus registry
#[derive(Debug)]
pub struct MetricRegistry {
    registry: Mutex<Registry>,
    gauges: [FloatGauge; 5],
    poll_cycles: Counter,
    poll_errors: Counter,
}

impl MetricRegistry {
    pub fn new() -> Self {
        let mut registry = Registry::default();
        let gauges: [FloatGauge; 5] = Default::default();

        for name in MetricName::ALL {
            registry.register(name.as_str(), name.help(), gauges[name.index()].clone());
        }

        let poll_cycles = Counter::default();
        registry.register(
            "poll_cycles",
            "Poll cycles started, including failed ones",
            poll_cycles.clone(),
        );

        let poll_errors = Counter::default();
        registry.register(
            "poll_errors",
            "Poll cycles aborted by an upstream error",
            poll_errors.clone(),
        );

        Self {
            registry: Mutex::new(registry),
            gauges,
            poll_cycles,
            poll_errors,
        }
    }

    pub fn set(&self, name: MetricName, value: f64) {
        self.gauges[name.index()].set(value);
    }

    pub fn get(&self, name: MetricName) -> f64 {
        self.gauges[name.index()].get()
    }

    /// Set a gauge by its exposed name
    pub fn set_by_name(&self, name: &str, value: f64) -> Result<()> {
        let name: MetricName = name.parse()?;
        self.set(name, value);
        Ok(())
    }

    pub fn inc_poll_cycles(&self) {
        self.poll_cycles.inc();
    }

    pub fn inc_poll_errors(&self) {
        self.poll_errors.inc();
    }

    pub fn poll_cycles(&self) -> u64 {
        self.poll_cycles.get()
    }

    pub fn poll_errors(&self) -> u64 {
        self.poll_errors.get()
    }

    /// Current values of every gauge, in registration order
    pub fn snapshot(&self) -> Vec<MetricSample> {
        MetricName::ALL
            .into_iter()
            .map(|name| MetricSample {
                name: name.as_str(),
                value: self.get(name),
            })
            .collect()
    }

    /// Render all metrics in the text exposition format
    pub fn encode(&self) -> Result<String> {
        let registry = self
            .registry
            .lock()
            .map_err(|e| Error::Config(format!("Failed to lock metrics registry: {}", e)))?;

        let mut buffer = String::new();
        encode(&mut buffer, &registry)
            .map_err(|e| Error::Serialization(format!("Failed to encode metrics: {}", e)))?;

        Ok(buffer)
    }
}

impl Default for MetricRegistry {
    fn default() -> Self {
        Self::new()
    }
}
