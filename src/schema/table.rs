//! Per-user event table and its prepared, chronologically sorted view

use crate::calendar;
use crate::error::ComputeError;
use crate::types::{Column, Event, EventType, WeekBucket};
use chrono::{FixedOffset, NaiveDate};
use std::collections::{BTreeMap, BTreeSet};

/// The raw interaction log of one learner
///
/// A column is present when it is always provided (type, timestamp, date),
/// when at least one row carries a value for it, or when it was declared.
#[derive(Debug, Clone, Default)]
pub struct EventTable {
    events: Vec<Event>,
    columns: BTreeSet<Column>,
}

impl EventTable {
    /// Build a table, inferring the column set from the rows
    pub fn new(events: Vec<Event>) -> Self {
        let mut columns: BTreeSet<Column> = Column::ALWAYS_PRESENT.into_iter().collect();
        for column in Column::ALL {
            if events.iter().any(|e| column.populated_by(e)) {
                columns.insert(column);
            }
        }
        Self { events, columns }
    }

    /// Declare columns the source provides even if no row populates them
    pub fn with_columns(mut self, columns: impl IntoIterator<Item = Column>) -> Self {
        self.columns.extend(columns);
        self
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn columns(&self) -> &BTreeSet<Column> {
        &self.columns
    }

    pub fn has_column(&self, column: Column) -> bool {
        self.columns.contains(&column)
    }

    /// Fail fast, naming every missing column
    pub fn require(&self, feature: &str, required: &[Column]) -> Result<(), ComputeError> {
        let missing: Vec<&str> = required
            .iter()
            .filter(|c| !self.has_column(**c))
            .map(Column::as_str)
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ComputeError::MissingColumns {
                feature: feature.to_string(),
                columns: missing.join(", "),
            })
        }
    }

    /// First user identifier found in the table
    pub fn user_id(&self) -> Option<&str> {
        self.events.iter().find_map(|e| e.user_id.as_deref())
    }

    /// Rows of the given types; the column set is kept
    pub fn filter_types(&self, types: &[EventType]) -> EventTable {
        Self {
            events: self
                .events
                .iter()
                .filter(|e| types.contains(&e.event_type))
                .cloned()
                .collect(),
            columns: self.columns.clone(),
        }
    }

    /// Sort chronologically and precompute calendar buckets
    pub fn prepare(&self, offset: FixedOffset) -> PreparedEvents<'_> {
        let mut rows: Vec<PreparedRow<'_>> = self
            .events
            .iter()
            .map(|event| {
                let day = calendar::day(&event.timestamp, &offset);
                PreparedRow {
                    event,
                    day,
                    week: calendar::week_bucket(day),
                }
            })
            .collect();
        // Stable: same-instant rows keep their input order
        rows.sort_by_key(|r| r.event.timestamp);
        PreparedEvents { rows, offset }
    }
}

impl From<Vec<Event>> for EventTable {
    fn from(events: Vec<Event>) -> Self {
        Self::new(events)
    }
}

/// One event with its local calendar buckets
#[derive(Debug, Clone, Copy)]
pub struct PreparedRow<'a> {
    pub event: &'a Event,
    pub day: NaiveDate,
    pub week: WeekBucket,
}

impl<'a> PreparedRow<'a> {
    pub fn video_id(&self) -> Option<&'a str> {
        self.event.video_id.as_deref()
    }
}

/// Immutable, chronologically sorted view of an event table
///
/// Built once per user and shared by every series builder.
#[derive(Debug, Clone)]
pub struct PreparedEvents<'a> {
    rows: Vec<PreparedRow<'a>>,
    offset: FixedOffset,
}

impl<'a> PreparedEvents<'a> {
    pub fn rows(&self) -> &[PreparedRow<'a>] {
        &self.rows
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// For every row, the index of the next Play on the same video
    ///
    /// Built in one reverse pass; rows without a video get `None`.
    pub fn next_play_indices(&self) -> Vec<Option<usize>> {
        let mut next_play: BTreeMap<&'a str, usize> = BTreeMap::new();
        let mut indices = vec![None; self.rows.len()];
        for (index, row) in self.rows.iter().enumerate().rev() {
            let Some(video) = row.video_id() else {
                continue;
            };
            indices[index] = next_play.get(video).copied();
            if row.event.event_type == EventType::Play {
                next_play.insert(video, index);
            }
        }
        indices
    }

    /// For every row, the index of the next row that belongs to some video
    pub fn next_video_row_indices(&self) -> Vec<Option<usize>> {
        let mut next = None;
        let mut indices = vec![None; self.rows.len()];
        for (index, row) in self.rows.iter().enumerate().rev() {
            indices[index] = next;
            if row.video_id().is_some() {
                next = Some(index);
            }
        }
        indices
    }

    /// Rows belonging to a video, in chronological order
    pub fn video_rows<'s>(&'s self, video_id: &'s str) -> impl Iterator<Item = &'s PreparedRow<'a>> {
        self.rows
            .iter()
            .filter(move |r| r.video_id() == Some(video_id))
    }
}
