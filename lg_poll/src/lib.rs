//! ABOUTME: Poll cycle orchestration for the live stream exporter
//! ABOUTME: Maps platform statuses to gauges and drives cycles on an interval

pub mod cycle;
pub mod mapper;
pub mod scheduler;

#[cfg(test)]
mod mock;

pub use cycle::{CycleOutcome, PollCycle, DEFAULT_CALL_TIMEOUT};
pub use mapper::{map_health_status, map_stream_status, HealthStatus, StreamStatus};
pub use scheduler::{CycleGuard, CyclePermit, PollScheduler};
