//! Quiz feature family (NQZ, PQZ, IVQ, SRQ)
//!
//! These features read quiz completions rather than the activity timeline, so
//! they are computed here instead of through the periodicity dispatcher.

use crate::calendar::seconds_between;
use crate::schema::PreparedEvents;
use crate::stats;
use crate::types::{CourseSchedule, EventType};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// First completion time of every completed quiz
pub fn first_completions<'a>(prepared: &PreparedEvents<'a>) -> BTreeMap<&'a str, DateTime<Utc>> {
    let mut completions = BTreeMap::new();
    for row in prepared.rows() {
        if row.event.event_type != EventType::QuizCompleted {
            continue;
        }
        if let Some(problem) = row.event.problem_id.as_deref() {
            completions.entry(problem).or_insert(row.event.timestamp);
        }
    }
    completions
}

/// NQZ: number of distinct quizzes completed
pub fn nb_quiz(prepared: &PreparedEvents<'_>) -> f64 {
    first_completions(prepared).len() as f64
}

/// PQZ: share of the course's quizzes that were completed; NaN without quizzes
pub fn prop_quiz(prepared: &PreparedEvents<'_>, schedule: &CourseSchedule) -> f64 {
    let catalogue = schedule.quiz_catalogue();
    if catalogue.is_empty() {
        return f64::NAN;
    }
    let completions = first_completions(prepared);
    let completed = catalogue
        .keys()
        .filter(|problem| completions.contains_key(**problem))
        .count();
    completed as f64 / catalogue.len() as f64
}

/// Minutes from the first view of a quiz's video to the quiz's first completion
///
/// Quizzes without a linked video, without a prior view, or never completed
/// contribute nothing.
pub fn video_quiz_intervals(prepared: &PreparedEvents<'_>, schedule: &CourseSchedule) -> Vec<f64> {
    let mut first_views: BTreeMap<&str, DateTime<Utc>> = BTreeMap::new();
    for row in prepared.rows() {
        if let Some(video) = row.video_id() {
            first_views.entry(video).or_insert(row.event.timestamp);
        }
    }
    let completions = first_completions(prepared);

    schedule
        .quiz_catalogue()
        .into_iter()
        .filter_map(|(problem, video)| {
            let completed = completions.get(problem)?;
            let viewed = first_views.get(video?)?;
            let minutes = seconds_between(viewed, completed) / 60.0;
            (minutes >= 0.0).then_some(minutes)
        })
        .collect()
}

/// IVQ: interquartile range of the video-to-quiz intervals (minutes)
pub fn interval_video_quiz(prepared: &PreparedEvents<'_>, schedule: &CourseSchedule) -> f64 {
    stats::iqr(&video_quiz_intervals(prepared, schedule))
}

/// SRQ: standard deviation (hours) of the quiz completion times
///
/// Smaller values mean completions are bunched together; fewer than two
/// completions give NaN.
pub fn semester_repartition_quiz(prepared: &PreparedEvents<'_>) -> f64 {
    let completions: Vec<DateTime<Utc>> = first_completions(prepared).into_values().collect();
    let Some(origin) = completions.iter().min().copied() else {
        return f64::NAN;
    };
    let hours: Vec<f64> = completions
        .iter()
        .map(|at| seconds_between(&origin, at) / 3600.0)
        .collect();
    stats::std(&hours)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::EventTable;
    use crate::types::Event;
    use chrono::{Duration, FixedOffset, TimeZone};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap()
    }

    fn table() -> EventTable {
        EventTable::new(vec![
            Event::video(EventType::Play, start(), "v1"),
            Event::video(EventType::Play, start() + Duration::minutes(30), "v2"),
            Event::video(EventType::Play, start() + Duration::hours(5), "v1"),
            Event::quiz(EventType::QuizAttempt, start() + Duration::minutes(50), "q1"),
            Event::quiz(EventType::QuizCompleted, start() + Duration::minutes(60), "q1"),
            Event::quiz(EventType::QuizCompleted, start() + Duration::minutes(90), "q1"),
            Event::quiz(EventType::QuizCompleted, start() + Duration::minutes(150), "q2"),
            Event::quiz(EventType::QuizCompleted, start() + Duration::hours(6), "q3"),
        ])
    }

    fn schedule() -> CourseSchedule {
        CourseSchedule::new()
            .quiz("q1", Some("v1"))
            .quiz("q2", Some("v2"))
            .quiz("q3", None)
            .quiz("q4", Some("v4"))
    }

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn test_nb_and_prop_quiz() {
        let table = table();
        let prepared = table.prepare(utc());
        assert_eq!(nb_quiz(&prepared), 3.0);
        assert_eq!(prop_quiz(&prepared, &schedule()), 0.75);
        assert!(prop_quiz(&prepared, &CourseSchedule::new()).is_nan());
    }

    #[test]
    fn test_video_quiz_intervals() {
        let table = table();
        let prepared = table.prepare(utc());
        let mut intervals = video_quiz_intervals(&prepared, &schedule());
        intervals.sort_by(f64::total_cmp);
        // q1: v1 first viewed at 0, completed at 60; q2: v2 at 30, completed at 150
        assert_eq!(intervals, vec![60.0, 120.0]);
        assert!((interval_video_quiz(&prepared, &schedule()) - 30.0).abs() < 1e-12);
    }

    #[test]
    fn test_semester_repartition() {
        let table = table();
        let prepared = table.prepare(utc());
        // Completions at 1 h, 2.5 h, 6 h
        let expected = stats::std(&[0.0, 1.5, 5.0]);
        assert!((semester_repartition_quiz(&prepared) - expected).abs() < 1e-12);

        let empty = EventTable::new(Vec::new());
        assert!(semester_repartition_quiz(&empty.prepare(utc())).is_nan());
    }
}
