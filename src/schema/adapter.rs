//! Adapter for decoding interaction logs into event tables
//!
//! Accepts a JSON array or NDJSON stream of events and groups them into one
//! table per learner. The engine itself never reads input; this is the
//! collaborator that hands it ready tables.

use crate::error::ComputeError;
use crate::schema::table::EventTable;
use crate::types::Event;
use std::collections::BTreeMap;
use tracing::debug;

/// Rows without a user identifier are grouped under this key
pub const ANONYMOUS_USER: &str = "anonymous";

/// Adapter for converting raw JSON logs to event tables
pub struct EventTableAdapter;

impl EventTableAdapter {
    /// Parse a JSON string containing an array of events
    pub fn parse_array(json: &str) -> Result<Vec<Event>, ComputeError> {
        let events: Vec<Event> = serde_json::from_str(json)?;
        Ok(events)
    }

    /// Parse NDJSON (newline-delimited JSON) containing events
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<Event>, ComputeError> {
        let mut events = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<Event>(trimmed) {
                Ok(event) => events.push(event),
                Err(e) => {
                    return Err(ComputeError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(events)
    }

    /// Split a mixed log into one table per learner
    pub fn split_by_user(events: Vec<Event>) -> BTreeMap<String, EventTable> {
        let mut by_user: BTreeMap<String, Vec<Event>> = BTreeMap::new();
        for event in events {
            let user = event
                .user_id
                .clone()
                .unwrap_or_else(|| ANONYMOUS_USER.to_string());
            by_user.entry(user).or_default().push(event);
        }
        debug!(users = by_user.len(), "split interaction log by user");

        by_user
            .into_iter()
            .map(|(user, events)| (user, EventTable::new(events)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Column, EventType};

    #[test]
    fn test_parse_array() {
        let json = r#"[
            {"event_type": "Video.Play", "timestamp": "2024-03-04T10:00:00Z", "video_id": "v1", "user_id": "u1"},
            {"event_type": "Video.Pause", "timestamp": "2024-03-04T10:05:00Z", "video_id": "v1", "user_id": "u1"}
        ]"#;
        let events = EventTableAdapter::parse_array(json).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].event_type, EventType::Pause);
    }

    #[test]
    fn test_parse_ndjson_reports_line() {
        let ndjson = "{\"event_type\": \"Video.Play\", \"timestamp\": \"2024-03-04T10:00:00Z\"}\n\n{broken}\n";
        let err = EventTableAdapter::parse_ndjson(ndjson).unwrap_err();
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn test_split_by_user() {
        let ndjson = r#"{"event_type": "Video.Play", "timestamp": "2024-03-04T10:00:00Z", "video_id": "v1", "user_id": "u1"}
{"event_type": "Video.Play", "timestamp": "2024-03-04T11:00:00Z", "video_id": "v2", "user_id": "u2", "duration": 300}
{"event_type": "Video.Stop", "timestamp": "2024-03-04T12:00:00Z", "video_id": "v2"}"#;
        let events = EventTableAdapter::parse_ndjson(ndjson).unwrap();
        let tables = EventTableAdapter::split_by_user(events);

        assert_eq!(tables.len(), 3);
        assert_eq!(tables["u1"].len(), 1);
        assert!(!tables["u1"].has_column(Column::Duration));
        assert!(tables["u2"].has_column(Column::Duration));
        assert_eq!(tables[ANONYMOUS_USER].len(), 1);
    }
}
