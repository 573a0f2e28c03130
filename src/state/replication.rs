//! Incremental replication filtering
//!
//! Replication values are RFC 3339 timestamps. Values that do not parse are
//! compared as plain strings.

use crate::types::JsonValue;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;

/// Compare two replication values
pub fn compare_replication_values(a: &str, b: &str) -> Ordering {
    match (parse_timestamp(a), parse_timestamp(b)) {
        (Some(a), Some(b)) => a.cmp(&b),
        _ => a.cmp(b),
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Filters one stream's records against a lower bound and tracks the
/// largest replication value admitted
#[derive(Debug, Clone)]
pub struct ReplicationTracker {
    key: String,
    threshold: Option<String>,
    max_seen: Option<String>,
}

impl ReplicationTracker {
    /// Track `key`, admitting only values at or after `threshold`
    pub fn new(key: impl Into<String>, threshold: Option<String>) -> Self {
        Self {
            key: key.into(),
            threshold,
            max_seen: None,
        }
    }

    /// Replication key field
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether `record` should be emitted
    ///
    /// Records without a string value for the key are always emitted and
    /// do not move the bookmark.
    pub fn admit(&mut self, record: &JsonValue) -> bool {
        let Some(value) = record.get(&self.key).and_then(JsonValue::as_str) else {
            return true;
        };

        if let Some(threshold) = &self.threshold {
            if compare_replication_values(value, threshold) == Ordering::Less {
                return false;
            }
        }

        let is_new_max = self
            .max_seen
            .as_deref()
            .map_or(true, |max| compare_replication_values(value, max) == Ordering::Greater);
        if is_new_max {
            self.max_seen = Some(value.to_string());
        }
        true
    }

    /// Value to bookmark after the run: the largest admitted value, or the
    /// starting threshold when nothing newer was seen
    pub fn bookmark(&self) -> Option<&str> {
        self.max_seen.as_deref().or(self.threshold.as_deref())
    }

    /// Largest admitted value
    pub fn max_seen(&self) -> Option<&str> {
        self.max_seen.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test_case("2024-01-01T00:00:00Z", "2024-01-02T00:00:00Z", Ordering::Less ; "earlier day")]
    #[test_case("2024-01-01T05:00:00+05:00", "2024-01-01T00:00:00Z", Ordering::Equal ; "offsets normalized")]
    #[test_case("2024-01-01T00:00:00.5Z", "2024-01-01T00:00:00Z", Ordering::Greater ; "fractional seconds")]
    #[test_case("b", "a", Ordering::Greater ; "string fallback")]
    fn test_compare_replication_values(a: &str, b: &str, expected: Ordering) {
        assert_eq!(compare_replication_values(a, b), expected);
    }

    #[test]
    fn test_tracker_filters_below_threshold() {
        let mut tracker =
            ReplicationTracker::new("updateTime", Some("2024-03-01T00:00:00Z".to_string()));

        assert!(!tracker.admit(&json!({"updateTime": "2024-02-28T23:59:59Z"})));
        assert!(tracker.admit(&json!({"updateTime": "2024-03-01T00:00:00Z"})));
        assert!(tracker.admit(&json!({"updateTime": "2024-03-05T00:00:00Z"})));
        assert!(tracker.admit(&json!({"updateTime": "2024-03-02T00:00:00Z"})));

        assert_eq!(tracker.max_seen(), Some("2024-03-05T00:00:00Z"));
        assert_eq!(tracker.bookmark(), Some("2024-03-05T00:00:00Z"));
    }

    #[test]
    fn test_tracker_without_threshold_admits_everything() {
        let mut tracker = ReplicationTracker::new("updateTime", None);
        assert!(tracker.admit(&json!({"updateTime": "2020-01-01T00:00:00Z"})));
        assert!(tracker.admit(&json!({"orderId": "1"})));
        assert_eq!(tracker.bookmark(), Some("2020-01-01T00:00:00Z"));
    }

    #[test]
    fn test_tracker_keeps_threshold_when_nothing_new() {
        let mut tracker =
            ReplicationTracker::new("updateTime", Some("2024-03-01T00:00:00Z".to_string()));
        assert!(!tracker.admit(&json!({"updateTime": "2024-01-01T00:00:00Z"})));

        assert_eq!(tracker.max_seen(), None);
        assert_eq!(tracker.bookmark(), Some("2024-03-01T00:00:00Z"));
    }
}
