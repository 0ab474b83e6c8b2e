//! ABOUTME: Maps platform status vocabularies onto ordered gauge values
//! ABOUTME: Pure functions; unknown strings are reported, never guessed

use lg_core::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Lifecycle of the bound ingest stream, ordered by gauge value
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StreamStatus {
    Inactive,
    Error,
    Created,
    Ready,
    Active,
}

impl StreamStatus {
    pub const ALL: [StreamStatus; 5] = [
        StreamStatus::Inactive,
        StreamStatus::Error,
        StreamStatus::Created,
        StreamStatus::Ready,
        StreamStatus::Active,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StreamStatus::Inactive => "inactive",
            StreamStatus::Error => "error",
            StreamStatus::Created => "created",
            StreamStatus::Ready => "ready",
            StreamStatus::Active => "active",
        }
    }

    pub fn metric_value(&self) -> u8 {
        match self {
            StreamStatus::Inactive => 0,
            StreamStatus::Error => 1,
            StreamStatus::Created => 2,
            StreamStatus::Ready => 3,
            StreamStatus::Active => 4,
        }
    }
}

impl fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StreamStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        StreamStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| Error::UnknownStatus {
                kind: "stream",
                value: s.to_string(),
            })
    }
}

/// Health of the bound ingest stream, ordered by gauge value
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HealthStatus {
    NoData,
    Bad,
    Ok,
    Good,
}

impl HealthStatus {
    pub const ALL: [HealthStatus; 4] = [
        HealthStatus::NoData,
        HealthStatus::Bad,
        HealthStatus::Ok,
        HealthStatus::Good,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::NoData => "noData",
            HealthStatus::Bad => "bad",
            HealthStatus::Ok => "ok",
            HealthStatus::Good => "good",
        }
    }

    pub fn metric_value(&self) -> u8 {
        match self {
            HealthStatus::NoData => 0,
            HealthStatus::Bad => 1,
            HealthStatus::Ok => 2,
            HealthStatus::Good => 3,
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HealthStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        HealthStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| Error::UnknownStatus {
                kind: "health",
                value: s.to_string(),
            })
    }
}

/// Map a stream status string to its gauge value
pub fn map_stream_status(s: &str) -> Result<u8> {
    s.parse::<StreamStatus>().map(|status| status.metric_value())
}

/// Map a health status string to its gauge value
pub fn map_health_status(s: &str) -> Result<u8> {
    s.parse::<HealthStatus>().map(|status| status.metric_value())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_stream_status_values() {
        assert_eq!(map_stream_status("inactive").unwrap(), 0);
        assert_eq!(map_stream_status("error").unwrap(), 1);
        assert_eq!(map_stream_status("created").unwrap(), 2);
        assert_eq!(map_stream_status("ready").unwrap(), 3);
        assert_eq!(map_stream_status("active").unwrap(), 4);
    }

    #[test]
    fn test_stream_status_injective_and_ordered() {
        let values: HashSet<u8> = StreamStatus::ALL.iter().map(|s| s.metric_value()).collect();
        assert_eq!(values.len(), StreamStatus::ALL.len());

        for pair in StreamStatus::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(pair[0].metric_value() < pair[1].metric_value());
        }
    }

    #[test]
    fn test_health_status_values() {
        assert_eq!(map_health_status("noData").unwrap(), 0);
        assert_eq!(map_health_status("bad").unwrap(), 1);
        assert_eq!(map_health_status("ok").unwrap(), 2);
        assert_eq!(map_health_status("good").unwrap(), 3);
    }

    #[test]
    fn test_unknown_status_is_reported() {
        match map_stream_status("revoked") {
            Err(Error::UnknownStatus { kind, value }) => {
                assert_eq!(kind, "stream");
                assert_eq!(value, "revoked");
            }
            other => panic!("expected UnknownStatus, got {:?}", other),
        }

        assert!(matches!(
            map_health_status("nodata"),
            Err(Error::UnknownStatus { kind: "health", .. })
        ));
        assert!(map_stream_status("").is_err());
        assert!(map_stream_status("Active").is_err());
    }

    #[test]
    fn test_display_roundtrip() {
        for status in StreamStatus::ALL {
            assert_eq!(status.to_string().parse::<StreamStatus>().unwrap(), status);
        }
        for status in HealthStatus::ALL {
            assert_eq!(status.to_string().parse::<HealthStatus>().unwrap(), status);
        }
    }
}
