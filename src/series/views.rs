//! Weekly view/proportion builders and interruption detection

use crate::aggregate::views;
use crate::calendar::{self, duration_from_secs, seconds_between};
use crate::config::FeatureConfig;
use crate::schema::PreparedEvents;
use crate::types::{CourseSchedule, EventType, WeekBucket};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// One week's ratio in a weekly proportion series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeeklyRatio {
    pub week: WeekBucket,
    /// Week index from the first scheduled week
    pub semester_week: Option<u32>,
    pub ratio: f64,
}

impl WeeklyRatio {
    /// Plain ratios of a weekly series
    pub fn values(series: &[WeeklyRatio]) -> Vec<f64> {
        series.iter().map(|w| w.ratio).collect()
    }
}

/// Distinct videos with at least one view per week
fn watched_by_week<'a>(prepared: &PreparedEvents<'a>) -> BTreeMap<WeekBucket, BTreeSet<&'a str>> {
    let mut watched: BTreeMap<WeekBucket, BTreeSet<&'a str>> = BTreeMap::new();
    for (video, day) in views(prepared) {
        watched
            .entry(calendar::week_bucket(day))
            .or_default()
            .insert(video);
    }
    watched
}

/// Build one ratio per scheduled week with at least one assigned video
///
/// `count` receives the week and its assigned set and returns
/// `(numerator, denominator)`; weeks with a zero denominator are skipped.
fn weekly_series<F>(schedule: &CourseSchedule, mut count: F) -> Vec<WeeklyRatio>
where
    F: FnMut(WeekBucket, &BTreeSet<&str>) -> (usize, usize),
{
    let assigned = schedule.assigned_by_week();
    let first_week = assigned.keys().next().copied();

    let mut series = Vec::new();
    for (week, videos) in &assigned {
        if videos.is_empty() {
            continue;
        }
        let (numerator, denominator) = count(*week, videos);
        if denominator == 0 {
            continue;
        }
        series.push(WeeklyRatio {
            week: *week,
            semester_week: first_week.and_then(|first| calendar::semester_week(*week, first)),
            ratio: numerator as f64 / denominator as f64,
        });
    }
    series
}

/// Proportion of assigned videos watched, per week
pub fn weekly_prop_watched(
    prepared: &PreparedEvents<'_>,
    schedule: &CourseSchedule,
) -> Vec<WeeklyRatio> {
    let watched = watched_by_week(prepared);
    weekly_series(schedule, |week, assigned| {
        let seen = watched
            .get(&week)
            .map_or(0, |w| assigned.iter().filter(|v| w.contains(**v)).count());
        (seen, assigned.len())
    })
}

/// Proportion of assigned videos viewed on two or more distinct days of a week
pub fn weekly_prop_replayed(
    prepared: &PreparedEvents<'_>,
    schedule: &CourseSchedule,
) -> Vec<WeeklyRatio> {
    let mut view_days: BTreeMap<(WeekBucket, &str), usize> = BTreeMap::new();
    for (video, day) in views(prepared) {
        *view_days
            .entry((calendar::week_bucket(day), video))
            .or_default() += 1;
    }

    weekly_series(schedule, |week, assigned| {
        let replayed = assigned
            .iter()
            .filter(|v| view_days.get(&(week, **v)).is_some_and(|days| *days >= 2))
            .count();
        (replayed, assigned.len())
    })
}

/// Proportion of watched assigned videos that were interrupted, per week
///
/// Weeks in which no assigned video was watched have no defined ratio and
/// are left out of the series.
pub fn weekly_prop_interrupted(
    prepared: &PreparedEvents<'_>,
    schedule: &CourseSchedule,
    config: &FeatureConfig,
) -> Vec<WeeklyRatio> {
    let watched = watched_by_week(prepared);
    let mut interrupted: BTreeMap<WeekBucket, BTreeSet<&str>> = BTreeMap::new();
    for (video, day) in interrupted_views(prepared, config) {
        interrupted
            .entry(calendar::week_bucket(day))
            .or_default()
            .insert(video);
    }

    weekly_series(schedule, |week, assigned| {
        let Some(seen) = watched.get(&week) else {
            return (0, 0);
        };
        let watched_assigned: Vec<&str> = assigned
            .iter()
            .copied()
            .filter(|v| seen.contains(*v))
            .collect();
        let cut = interrupted.get(&week).map_or(0, |set| {
            watched_assigned.iter().filter(|v| set.contains(**v)).count()
        });
        (cut, watched_assigned.len())
    })
}

/// Nominal length of each video, from the first row that reports a usable one
fn video_durations<'a>(prepared: &PreparedEvents<'a>) -> BTreeMap<&'a str, f64> {
    let mut durations = BTreeMap::new();
    for row in prepared.rows() {
        if let (Some(video), Some(duration)) = (row.video_id(), row.event.known_duration()) {
            durations.entry(video).or_insert(duration);
        }
    }
    durations
}

/// Views (video, day) flagged as interrupted
///
/// With `s` the first event of the view and `d` the video's nominal length,
/// a view is interrupted when any of the following holds:
/// - a Pause is followed by the next Play on the same video after a gap of at
///   least the long-break threshold;
/// - a Pause before `s + d - end_window` is directly followed by an event on
///   another video;
/// - an event is directly followed by an event on another video before
///   `s + d`, and no Stop was seen on the view so far.
///
/// The last-minute window is inclusive: a pause at exactly `s + d - end_window`
/// is in the last minute. Videos without a usable length, or whose nominal end
/// falls outside the representable calendar, only go through the first rule.
pub fn interrupted_views<'a>(
    prepared: &PreparedEvents<'a>,
    config: &FeatureConfig,
) -> BTreeSet<(&'a str, NaiveDate)> {
    let rows = prepared.rows();
    let durations = video_durations(prepared);
    let end_window = duration_from_secs(config.end_window_sec);
    let next_play = prepared.next_play_indices();
    let next_video_row = prepared.next_video_row_indices();

    let mut view_start = BTreeMap::new();
    let mut stopped = BTreeSet::new();
    let mut interrupted = BTreeSet::new();

    for (index, row) in rows.iter().enumerate() {
        let Some(video) = row.video_id() else {
            continue;
        };
        let key = (video, row.day);
        let timestamp = row.event.timestamp;
        let start = *view_start.entry(key).or_insert(timestamp);
        if row.event.event_type == EventType::Stop {
            stopped.insert(key);
        }

        let nominal_end = durations
            .get(video)
            .and_then(|d| duration_from_secs(*d))
            .and_then(|d| start.checked_add_signed(d));
        let next = next_video_row[index].map(|i| &rows[i]);
        let leaves_video = next.is_some_and(|n| n.video_id() != Some(video));

        if row.event.event_type == EventType::Pause {
            if let Some(play) = next_play[index].map(|i| &rows[i]) {
                if seconds_between(&timestamp, &play.event.timestamp) >= config.long_break_sec {
                    interrupted.insert(key);
                }
            }

            let last_minute = nominal_end
                .zip(end_window)
                .and_then(|(end, window)| end.checked_sub_signed(window));
            if let Some(last_minute) = last_minute {
                if leaves_video && timestamp < last_minute {
                    interrupted.insert(key);
                }
            }
        }

        if let (Some(end), Some(next)) = (nominal_end, next) {
            if leaves_video && next.event.timestamp < end && !stopped.contains(&key) {
                interrupted.insert(key);
            }
        }
    }

    debug!(
        views = view_start.len(),
        interrupted = interrupted.len(),
        "interruption detection"
    );
    interrupted
}

/// Hours of content watched: nominal length summed over (video, day) views
pub fn watched_hours(prepared: &PreparedEvents<'_>) -> f64 {
    let durations = video_durations(prepared);
    let mut first_rows: BTreeMap<(&str, NaiveDate), Option<f64>> = BTreeMap::new();
    for row in prepared.rows() {
        if let Some(video) = row.video_id() {
            first_rows
                .entry((video, row.day))
                .or_insert(row.event.known_duration());
        }
    }

    first_rows
        .into_iter()
        .map(|((video, _), duration)| {
            duration
                .or_else(|| durations.get(video).copied())
                .unwrap_or(0.0)
        })
        .sum::<f64>()
        / 3600.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::EventTable;
    use crate::types::Event;
    use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    // 2024-03-04 is the Monday of ISO week 10
    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, minute, 0).unwrap()
    }

    fn play(ts: DateTime<Utc>, video: &str) -> Event {
        Event::video(EventType::Play, ts, video).with_duration(600.0)
    }

    fn schedule() -> CourseSchedule {
        CourseSchedule::new()
            .assign(WeekBucket::new(2024, 10), ["v1", "v2"])
            .assign(WeekBucket::new(2024, 11), ["v3", "v4", "v5", "v6"])
            .assign(WeekBucket::new(2024, 12), Vec::<String>::new())
    }

    #[test]
    fn test_weekly_prop_watched() {
        let table = EventTable::new(vec![
            play(at(4, 10, 0), "v1"),
            play(at(5, 10, 0), "v2"),
            play(at(5, 11, 0), "extra"),
            play(at(12, 10, 0), "v3"),
        ]);
        let series = weekly_prop_watched(&table.prepare(utc()), &schedule());

        // Week 12 has no assigned video and is excluded
        assert_eq!(WeeklyRatio::values(&series), vec![1.0, 0.25]);
        assert_eq!(series[1].semester_week, Some(1));
        assert!(series.iter().all(|w| (0.0..=1.0).contains(&w.ratio)));
    }

    #[test]
    fn test_weekly_prop_watched_counts_unwatched_weeks_as_zero() {
        let table = EventTable::new(vec![play(at(4, 10, 0), "v1")]);
        let series = weekly_prop_watched(&table.prepare(utc()), &schedule());
        assert_eq!(WeeklyRatio::values(&series), vec![0.5, 0.0]);
    }

    #[test]
    fn test_weekly_prop_replayed() {
        let table = EventTable::new(vec![
            play(at(4, 10, 0), "v1"),
            play(at(4, 18, 0), "v1"), // same day, not a replay
            play(at(5, 10, 0), "v2"),
            play(at(7, 10, 0), "v2"), // second day
            play(at(11, 10, 0), "v3"), // Monday of week 11
            play(at(12, 10, 0), "v3"),
        ]);
        let series = weekly_prop_replayed(&table.prepare(utc()), &schedule());
        assert_eq!(WeeklyRatio::values(&series), vec![0.5, 0.25]);
    }

    #[test]
    fn test_long_break_interrupts() {
        let table = EventTable::new(vec![
            play(at(4, 10, 0), "v1"),
            Event::video(EventType::Pause, at(4, 10, 2), "v1"),
            play(at(4, 10, 12), "v1"),
            Event::video(EventType::Stop, at(4, 10, 20), "v1"),
        ]);
        let prepared = table.prepare(utc());
        let cut = interrupted_views(&prepared, &FeatureConfig::default());
        assert!(cut.contains(&("v1", at(4, 0, 0).date_naive())));
    }

    #[test]
    fn test_short_break_with_stop_is_not_interrupted() {
        let table = EventTable::new(vec![
            play(at(4, 10, 0), "v1"),
            Event::video(EventType::Pause, at(4, 10, 2), "v1"),
            play(at(4, 10, 5), "v1"),
            Event::video(EventType::Stop, at(4, 10, 13), "v1"),
            play(at(4, 10, 14), "v2"),
        ]);
        let prepared = table.prepare(utc());
        assert!(interrupted_views(&prepared, &FeatureConfig::default()).is_empty());
    }

    #[test]
    fn test_leaving_for_another_video() {
        // Pause early in v1, then jump to v2: both (b) and (c) fire for v1
        let table = EventTable::new(vec![
            play(at(4, 10, 0), "v1"),
            Event::video(EventType::Pause, at(4, 10, 1), "v1"),
            play(at(4, 10, 2), "v2"),
            Event::video(EventType::Stop, at(4, 10, 12), "v2"),
        ]);
        let prepared = table.prepare(utc());
        let cut = interrupted_views(&prepared, &FeatureConfig::default());
        assert_eq!(cut.len(), 1);
        assert!(cut.contains(&("v1", at(4, 0, 0).date_naive())));
    }

    #[test]
    fn test_pause_in_last_minute_then_switch_after_end() {
        // v1 lasts 600 s; pause at 9:30 is in the last minute and v2 starts after 10:00
        let start = at(4, 10, 0);
        let table = EventTable::new(vec![
            play(start, "v1"),
            Event::video(EventType::Pause, start + Duration::seconds(570), "v1"),
            play(start + Duration::seconds(620), "v2"),
        ]);
        let prepared = table.prepare(utc());
        assert!(interrupted_views(&prepared, &FeatureConfig::default())
            .iter()
            .all(|(video, _)| *video != "v1"));
    }

    /// Interrupted v1 views when v1 (600 s) is paused at `pause_at` and v2 starts at 620 s
    fn pause_then_switch_after_end(pause_at: i64) -> usize {
        let start = at(4, 10, 0);
        let table = EventTable::new(vec![
            play(start, "v1"),
            Event::video(EventType::Pause, start + Duration::seconds(pause_at), "v1"),
            play(start + Duration::seconds(620), "v2"),
        ]);
        let prepared = table.prepare(utc());
        interrupted_views(&prepared, &FeatureConfig::default())
            .iter()
            .filter(|(video, _)| *video == "v1")
            .count()
    }

    #[test]
    fn test_pause_before_last_minute_then_switch_interrupts() {
        // v2 starts after v1's nominal end, so only the pause rule can fire
        assert_eq!(pause_then_switch_after_end(539), 1);
    }

    #[test]
    fn test_pause_at_last_minute_boundary_is_not_interrupted() {
        // 600 s video: a pause at exactly 540 s is inside the last minute
        assert_eq!(pause_then_switch_after_end(540), 0);
    }

    #[test]
    fn test_unusable_duration_does_not_panic() {
        let start = at(4, 10, 0);
        for duration in [1e13, f64::INFINITY, -5.0] {
            let table = EventTable::new(vec![
                Event::video(EventType::Play, start, "v1").with_duration(duration),
                Event::video(EventType::Pause, start + Duration::seconds(10), "v1"),
                Event::video(EventType::Play, start + Duration::seconds(30), "v2"),
            ]);
            let prepared = table.prepare(utc());
            // The video's end is unknown, so neither end-relative rule applies
            assert!(interrupted_views(&prepared, &FeatureConfig::default()).is_empty());
            assert!(watched_hours(&prepared).is_finite());
        }
    }

    #[test]
    fn test_oversized_end_window_does_not_panic() {
        let config = FeatureConfig {
            end_window_sec: 1e15,
            ..FeatureConfig::default()
        };
        let start = at(4, 10, 0);
        let table = EventTable::new(vec![
            play(start, "v1"),
            Event::video(EventType::Pause, start + Duration::seconds(10), "v1"),
            play(start + Duration::seconds(620), "v2"),
        ]);
        assert!(interrupted_views(&table.prepare(utc()), &config).is_empty());
    }

    #[test]
    fn test_weekly_prop_interrupted_excludes_unwatched_weeks() {
        let table = EventTable::new(vec![
            play(at(4, 10, 0), "v1"),
            play(at(4, 10, 1), "v2"), // v1 left before its end
            Event::video(EventType::Stop, at(4, 10, 11), "v2"),
        ]);
        let prepared = table.prepare(utc());
        let series = weekly_prop_interrupted(&prepared, &schedule(), &FeatureConfig::default());

        // Week 11 has assigned videos but none watched
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].week, WeekBucket::new(2024, 10));
        assert_eq!(series[0].ratio, 0.5);
    }

    #[test]
    fn test_watched_hours() {
        let table = EventTable::new(vec![
            play(at(4, 10, 0), "v1"),
            Event::video(EventType::Pause, at(4, 10, 1), "v1"),
            play(at(5, 10, 0), "v1"),
            Event::video(EventType::Play, at(5, 11, 0), "v2").with_duration(1800.0),
        ]);
        let hours = watched_hours(&table.prepare(utc()));
        // Two views of v1 (600 s each) and one of v2 (1800 s)
        assert!((hours - 3000.0 / 3600.0).abs() < 1e-12);
    }
}
