//! Primitive aggregators
//!
//! Counting and deduplication primitives shared by the ratio and view features.

use crate::error::ComputeError;
use crate::schema::PreparedEvents;
use crate::types::{Event, EventType};
use chrono::NaiveDate;
use std::collections::BTreeSet;

/// Count of all rows
pub fn total_actions(events: &[Event]) -> usize {
    events.len()
}

/// Count of rows of one type
pub fn count_actions(events: &[Event], event_type: EventType) -> usize {
    events.iter().filter(|e| e.event_type == event_type).count()
}

/// Count of rows of one type, optionally collapsed to one row per video
pub fn total_events(events: &[Event], event_type: EventType, unique: bool) -> usize {
    let matching = events.iter().filter(|e| e.event_type == event_type);
    if unique {
        matching
            .map(|e| e.video_id.as_deref())
            .collect::<BTreeSet<_>>()
            .len()
    } else {
        matching.count()
    }
}

/// Distinct videos with at least one event
pub fn total_unique_videos(events: &[Event]) -> usize {
    events
        .iter()
        .filter_map(|e| e.video_id.as_deref())
        .collect::<BTreeSet<_>>()
        .len()
}

/// Distinct (video, day) views in chronological order of first occurrence
///
/// A video counts as watched at most once per calendar day, whatever the
/// number of replays or interruptions that day. Rows without a video are
/// not views.
pub fn views<'a>(prepared: &PreparedEvents<'a>) -> Vec<(&'a str, NaiveDate)> {
    let mut seen = BTreeSet::new();
    prepared
        .rows()
        .iter()
        .filter_map(|row| row.video_id().map(|video| (video, row.day)))
        .filter(|key| seen.insert(*key))
        .collect()
}

/// Number of (video, day) views
pub fn total_views(prepared: &PreparedEvents<'_>) -> usize {
    views(prepared).len()
}

/// Share of one event type among all actions
///
/// A table without actions is a defect of the caller, not an undefined statistic.
pub fn action_ratio(
    events: &[Event],
    event_type: EventType,
    feature: &str,
) -> Result<f64, ComputeError> {
    let total = total_actions(events);
    if total == 0 {
        return Err(ComputeError::DivisionByZero(feature.to_string()));
    }
    Ok(count_actions(events, event_type) as f64 / total as f64)
}
