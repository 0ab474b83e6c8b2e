use chrono::{DateTime, Utc};
use std::fmt;

/// Identifier attached to every poll cycle so its log lines can be correlated
///
/// Backed by a ULID, so ids sort by the time the cycle started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CycleId(ulid::Ulid);

impl CycleId {
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }

    /// Wall-clock time the cycle was started, to millisecond precision
    pub fn started_at(&self) -> DateTime<Utc> {
        i64::try_from(self.0.timestamp_ms())
            .ok()
            .and_then(DateTime::from_timestamp_millis)
            .unwrap_or_default()
    }
}

impl Default for CycleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CycleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_ids_are_distinct() {
        assert_ne!(CycleId::new(), CycleId::new());
    }

    #[test]
    fn test_started_at_is_creation_time() {
        let before = Utc::now();
        let id = CycleId::new();
        let after = Utc::now();

        let started = id.started_at();
        assert!(started >= before - chrono::Duration::milliseconds(1));
        assert!(started <= after);
    }

    #[test]
    fn test_display_is_ulid_text() {
        let id = CycleId::new();
        assert_eq!(id.to_string().len(), 26);
    }
}
