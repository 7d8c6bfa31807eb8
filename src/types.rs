//! Core data types for video interaction events
//!
//! These types describe the raw interaction log of one learner and the course
//! reference data (assigned videos, quizzes) that some features join against.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Interaction event types emitted by the video player and the quiz system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "Video.Load", alias = "load")]
    Load,
    #[serde(rename = "Video.Play", alias = "play")]
    Play,
    #[serde(rename = "Video.Pause", alias = "pause")]
    Pause,
    #[serde(rename = "Video.SeekBackward", alias = "seek_backward")]
    SeekBackward,
    #[serde(rename = "Video.SeekForward", alias = "seek_forward")]
    SeekForward,
    #[serde(rename = "Video.SpeedChange", alias = "speed_change")]
    SpeedChange,
    #[serde(rename = "Video.Stop", alias = "stop")]
    Stop,
    #[serde(rename = "Problem.Check", alias = "quiz_attempt")]
    QuizAttempt,
    #[serde(rename = "Problem.Complete", alias = "quiz_completed")]
    QuizCompleted,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Load => "Video.Load",
            EventType::Play => "Video.Play",
            EventType::Pause => "Video.Pause",
            EventType::SeekBackward => "Video.SeekBackward",
            EventType::SeekForward => "Video.SeekForward",
            EventType::SpeedChange => "Video.SpeedChange",
            EventType::Stop => "Video.Stop",
            EventType::QuizAttempt => "Problem.Check",
            EventType::QuizCompleted => "Problem.Complete",
        }
    }

    /// Seek events carry both an old and a new playback position
    pub fn is_seek(&self) -> bool {
        matches!(self, EventType::SeekBackward | EventType::SeekForward)
    }

    pub fn is_quiz(&self) -> bool {
        matches!(self, EventType::QuizAttempt | EventType::QuizCompleted)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observed interaction of a learner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Type of interaction
    pub event_type: EventType,
    /// Event timestamp (UTC)
    pub timestamp: DateTime<Utc>,
    /// Video the event belongs to (absent for quiz events)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
    /// Playback position before a seek (seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_time: Option<f64>,
    /// Playback position after a seek (seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_time: Option<f64>,
    /// Playback position when the event fired (seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_time: Option<f64>,
    /// Playback rate selected by a speed change
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_speed: Option<f64>,
    /// Nominal video length (seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// Course year / semester tag (YYYY)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Quiz problem identifier (quiz events only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub problem_id: Option<String>,
}

impl Event {
    /// Create a bare event with only the mandatory attributes
    pub fn new(event_type: EventType, timestamp: DateTime<Utc>) -> Self {
        Self {
            event_type,
            timestamp,
            video_id: None,
            old_time: None,
            new_time: None,
            current_time: None,
            new_speed: None,
            duration: None,
            year: None,
            user_id: None,
            problem_id: None,
        }
    }

    /// Create a video event
    pub fn video(
        event_type: EventType,
        timestamp: DateTime<Utc>,
        video_id: impl Into<String>,
    ) -> Self {
        Self {
            video_id: Some(video_id.into()),
            ..Self::new(event_type, timestamp)
        }
    }

    /// Create a quiz event
    pub fn quiz(
        event_type: EventType,
        timestamp: DateTime<Utc>,
        problem_id: impl Into<String>,
    ) -> Self {
        Self {
            problem_id: Some(problem_id.into()),
            ..Self::new(event_type, timestamp)
        }
    }

    pub fn with_seek(mut self, old_time: f64, new_time: f64) -> Self {
        self.old_time = Some(old_time);
        self.new_time = Some(new_time);
        self
    }

    pub fn with_current_time(mut self, current_time: f64) -> Self {
        self.current_time = Some(current_time);
        self
    }

    pub fn with_speed(mut self, new_speed: f64) -> Self {
        self.new_speed = Some(new_speed);
        self
    }

    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Nominal video length when it is usable: finite and not negative
    pub fn known_duration(&self) -> Option<f64> {
        self.duration.filter(|d| d.is_finite() && *d >= 0.0)
    }

    /// Playback position at the moment the event fired; seeks report where they left from
    pub fn position(&self) -> Option<f64> {
        if self.event_type.is_seek() {
            self.old_time.or(self.current_time)
        } else {
            self.current_time
        }
    }
}

/// Named columns of an event table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Column {
    VideoId,
    EventType,
    TimeStamp,
    Date,
    OldTime,
    NewTime,
    CurrentTime,
    NewSpeed,
    Duration,
    Year,
    UserId,
    ProblemId,
}

impl Column {
    /// Columns every table provides: the type, the timestamp and the date derived from it
    pub const ALWAYS_PRESENT: [Column; 3] = [Column::EventType, Column::TimeStamp, Column::Date];

    pub const ALL: [Column; 12] = [
        Column::VideoId,
        Column::EventType,
        Column::TimeStamp,
        Column::Date,
        Column::OldTime,
        Column::NewTime,
        Column::CurrentTime,
        Column::NewSpeed,
        Column::Duration,
        Column::Year,
        Column::UserId,
        Column::ProblemId,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Column::VideoId => "VideoID",
            Column::EventType => "EventType",
            Column::TimeStamp => "TimeStamp",
            Column::Date => "Date",
            Column::OldTime => "OldTime",
            Column::NewTime => "NewTime",
            Column::CurrentTime => "CurrentTime",
            Column::NewSpeed => "NewSpeed",
            Column::Duration => "Duration",
            Column::Year => "Year",
            Column::UserId => "UserID",
            Column::ProblemId => "ProblemID",
        }
    }

    /// Whether the event carries a value for this column
    pub fn populated_by(&self, event: &Event) -> bool {
        match self {
            Column::EventType | Column::TimeStamp | Column::Date => true,
            Column::VideoId => event.video_id.is_some(),
            Column::OldTime => event.old_time.is_some(),
            Column::NewTime => event.new_time.is_some(),
            Column::CurrentTime => event.current_time.is_some(),
            Column::NewSpeed => event.new_speed.is_some(),
            Column::Duration => event.duration.is_some(),
            Column::Year => event.year.is_some(),
            Column::UserId => event.user_id.is_some(),
            Column::ProblemId => event.problem_id.is_some(),
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// (ISO year, ISO week) aggregation unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WeekBucket {
    pub year: i32,
    pub week: u32,
}

impl WeekBucket {
    pub fn new(year: i32, week: u32) -> Self {
        Self { year, week }
    }
}

impl fmt::Display for WeekBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-W{:02}", self.year, self.week)
    }
}

/// Videos assigned for one week of the course
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignedWeek {
    pub year: i32,
    pub week: u32,
    #[serde(default)]
    pub videos: Vec<String>,
}

/// A graded quiz and the video it is attached to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizSpec {
    pub problem_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
}

/// Course reference data supplied by the caller
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CourseSchedule {
    #[serde(default)]
    pub weeks: Vec<AssignedWeek>,
    #[serde(default)]
    pub quizzes: Vec<QuizSpec>,
}

impl CourseSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign videos to a week (builder style)
    pub fn assign<I, S>(mut self, week: WeekBucket, videos: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.weeks.push(AssignedWeek {
            year: week.year,
            week: week.week,
            videos: videos.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Register a quiz (builder style)
    pub fn quiz(mut self, problem_id: impl Into<String>, video_id: Option<&str>) -> Self {
        self.quizzes.push(QuizSpec {
            problem_id: problem_id.into(),
            video_id: video_id.map(str::to_string),
        });
        self
    }

    /// Assigned video sets keyed by week; repeated weeks are merged
    pub fn assigned_by_week(&self) -> BTreeMap<WeekBucket, BTreeSet<&str>> {
        let mut by_week: BTreeMap<WeekBucket, BTreeSet<&str>> = BTreeMap::new();
        for assigned in &self.weeks {
            by_week
                .entry(WeekBucket::new(assigned.year, assigned.week))
                .or_default()
                .extend(assigned.videos.iter().map(String::as_str));
        }
        by_week
    }

    /// Problem id to linked video id
    pub fn quiz_catalogue(&self) -> BTreeMap<&str, Option<&str>> {
        self.quizzes
            .iter()
            .map(|q| (q.problem_id.as_str(), q.video_id.as_deref()))
            .collect()
    }

    /// Parse a schedule from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
