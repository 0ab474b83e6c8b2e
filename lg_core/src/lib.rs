//! ABOUTME: Core types, errors, cycle IDs, and tracing utilities
//! ABOUTME: Foundation crate used by all other livegauge components

pub mod credential;
pub mod error;
pub mod id;
pub mod telemetry;
pub mod time;

pub use credential::Credential;
pub use error::{Error, Result};
pub use id::CycleId;
pub use time::{seconds_since, unix_seconds, utc_now, MonotonicTimer};
