//! Interval and duration builders
//!
//! Pause durations, seek lengths and time spent speeding up, each returned as
//! a plain series for the catalogue to reduce.

use crate::calendar::seconds_between;
use crate::config::FeatureConfig;
use crate::schema::{PreparedEvents, PreparedRow};
use crate::types::{Event, EventType};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Seconds from each Pause to the next Play on the same video
///
/// Intervals at or above the long-break threshold are abandonments rather
/// than pauses and are left out.
pub fn pause_duration(prepared: &PreparedEvents<'_>, config: &FeatureConfig) -> Vec<f64> {
    let rows = prepared.rows();
    let next_play = prepared.next_play_indices();
    let mut durations = Vec::new();
    let mut discarded = 0usize;

    for (index, row) in rows.iter().enumerate() {
        if row.event.event_type != EventType::Pause {
            continue;
        }
        let Some(play) = next_play[index].map(|i| &rows[i]) else {
            continue;
        };

        let elapsed = seconds_between(&row.event.timestamp, &play.event.timestamp);
        if elapsed < config.long_break_sec {
            durations.push(elapsed);
        } else {
            discarded += 1;
        }
    }

    debug!(pauses = durations.len(), discarded, "pause durations");
    durations
}

/// Absolute distance jumped by every seek (forward and backward pooled)
pub fn seek_length(events: &[Event]) -> Vec<f64> {
    let mut incomplete = 0usize;
    let lengths: Vec<f64> = events
        .iter()
        .filter(|e| e.event_type.is_seek())
        .filter_map(|e| match (e.old_time, e.new_time) {
            (Some(old), Some(new)) => Some((new - old).abs()),
            _ => {
                incomplete += 1;
                None
            }
        })
        .collect();

    if incomplete > 0 {
        warn!(incomplete, "seek events without old/new position ignored");
    }
    lengths
}

/// Playback position right after an event
fn position_after(event: &Event) -> Option<f64> {
    if event.event_type.is_seek() {
        event.new_time.or(event.current_time)
    } else {
        event.current_time
    }
}

/// Accumulates time at speed > 1 for one video
#[derive(Debug)]
struct SpeedTracker {
    speed: f64,
    /// Position where the current fast segment started
    segment_start: Option<f64>,
    day: Option<NaiveDate>,
    duration: Option<f64>,
    total: f64,
    /// Fast segments that could not be measured
    dropped: usize,
}

impl SpeedTracker {
    fn new() -> Self {
        Self {
            speed: 1.0,
            segment_start: None,
            day: None,
            duration: None,
            total: 0.0,
            dropped: 0,
        }
    }

    /// Close the open fast segment at a playback position
    ///
    /// Without a position the segment stays open until the next event that
    /// reports one; playback does not advance in between.
    fn close_at(&mut self, position: Option<f64>) {
        let Some(end) = position else {
            return;
        };
        if let Some(start) = self.segment_start.take() {
            self.total += (end - start).max(0.0);
        }
    }

    /// A view ended without a further event: the fast segment runs to the end of the video
    fn close_view(&mut self) {
        if self.segment_start.is_some() && self.duration.is_none() {
            self.segment_start = None;
            self.dropped += 1;
        }
        let end = self.duration;
        self.close_at(end);
        self.speed = 1.0;
    }

    fn observe(&mut self, row: &PreparedRow<'_>) {
        let event = row.event;
        if self.duration.is_none() {
            self.duration = event.known_duration();
        }
        if self.day.is_some_and(|day| day != row.day) {
            self.close_view();
        }
        self.day = Some(row.day);

        let position = event.position();
        self.close_at(position);
        match event.event_type {
            EventType::SpeedChange => {
                self.speed = event.new_speed.unwrap_or(self.speed);
            }
            EventType::Stop => self.speed = 1.0,
            _ => {}
        }

        // Slowing down or stopping at an unknown position leaves an unmeasurable segment
        if position.is_none() && self.segment_start.is_some() && self.speed <= 1.0 {
            self.segment_start = None;
            self.dropped += 1;
        }

        let playing = !matches!(event.event_type, EventType::Pause | EventType::Stop);
        if playing && self.speed > 1.0 {
            if let Some(resume) = position_after(event) {
                self.segment_start = Some(resume);
            }
        }
    }
}

/// Playback seconds spent at a speed above 1x, one value per watched video
///
/// A fast segment runs from a speed change (or a resume while fast) to the
/// next event on the same video; when the view has no further event it runs
/// to the nominal end of the video. Videos never sped up contribute zero.
pub fn time_speeding_up(prepared: &PreparedEvents<'_>) -> Vec<f64> {
    let mut trackers: BTreeMap<&str, (usize, SpeedTracker)> = BTreeMap::new();
    for row in prepared.rows() {
        let Some(video) = row.video_id() else {
            continue;
        };
        let order = trackers.len();
        trackers
            .entry(video)
            .or_insert_with(|| (order, SpeedTracker::new()))
            .1
            .observe(row);
    }

    let mut dropped = 0usize;
    let mut per_video: Vec<(usize, f64)> = trackers
        .into_values()
        .map(|(order, mut tracker)| {
            tracker.close_view();
            dropped += tracker.dropped;
            (order, tracker.total)
        })
        .collect();
    per_video.sort_by_key(|(order, _)| *order);

    if dropped > 0 {
        warn!(dropped, "fast playback segments without a closing position ignored");
    }
    per_video.into_iter().map(|(_, total)| total).collect()
}
