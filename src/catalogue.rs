//! Feature catalogue and extraction facade
//!
//! Every feature has a short code and a descriptive name. [`FeatureExtractor`]
//! exposes one method per feature; each adapts a user's event table into the
//! matching derived series and reduces it to a scalar.

use crate::aggregate;
use crate::config::FeatureConfig;
use crate::error::ComputeError;
use crate::periodicity::{self, ActivityTimeline, FeatureCode};
use crate::quiz;
use crate::report::FeatureReport;
use crate::schema::{EventTable, PreparedEvents};
use crate::series::{self, WeeklyRatio};
use crate::stats;
use crate::types::{Column, CourseSchedule, EventType};
use chrono::{FixedOffset, Offset, Utc};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

macro_rules! catalogue {
    ($( $variant:ident => ($code:literal, $name:literal) ),+ $(,)?) => {
        /// Every feature the engine computes
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Feature {
            $( $variant, )+
        }

        impl Feature {
            pub const ALL: &'static [Feature] = &[ $( Feature::$variant, )+ ];

            /// Short feature code
            pub fn code(&self) -> &'static str {
                match self {
                    $( Feature::$variant => $code, )+
                }
            }

            /// Descriptive method name
            pub fn name(&self) -> &'static str {
                match self {
                    $( Feature::$variant => $name, )+
                }
            }
        }
    };
}

catalogue! {
    TotalActions => ("TAC", "total_actions"),
    TotalViews => ("TVW", "total_views"),
    TotalPlays => ("NPL", "total_plays"),
    TotalUniqueVideos => ("NUV", "total_unique_videos"),
    AvgWeeklyPropWatched => ("AWW", "avg_weekly_prop_watched"),
    StdWeeklyPropWatched => ("SWW", "std_weekly_prop_watched"),
    AvgWeeklyPropReplayed => ("AWR", "avg_weekly_prop_replayed"),
    StdWeeklyPropReplayed => ("SWR", "std_weekly_prop_replayed"),
    AvgWeeklyPropInterrupted => ("AWI", "avg_weekly_prop_interrupted"),
    StdWeeklyPropInterrupted => ("SWI", "std_weekly_prop_interrupted"),
    FreqAllActions => ("FAA", "freq_all_actions"),
    FreqPlay => ("FPL", "freq_play"),
    FreqPause => ("FPA", "freq_pause"),
    FreqSeekBackward => ("FSB", "freq_seek_backward"),
    FreqSeekForward => ("FSF", "freq_seek_forward"),
    FreqSpeedChange => ("FSC", "freq_speed_change"),
    FreqStop => ("FST", "freq_stop"),
    AvgPauseDuration => ("APD", "avg_pause_duration"),
    StdPauseDuration => ("SPD", "std_pause_duration"),
    AvgSeekLength => ("ASL", "avg_seek_length"),
    StdSeekLength => ("SSL", "std_seek_length"),
    AvgTimeSpeedingUp => ("ATS", "avg_time_speeding_up"),
    StdTimeSpeedingUp => ("STS", "std_time_speeding_up"),
    PeakDayHour => ("PDH", "peak_day_hour"),
    PeakWeekDay => ("PWD", "peak_week_day"),
    WeeklySimilarity1 => ("WS1", "weekly_similarity_1"),
    WeeklySimilarity2 => ("WS2", "weekly_similarity_2"),
    WeeklySimilarity3 => ("WS3", "weekly_similarity_3"),
    FreqDayHour => ("FDH", "freq_day_hour"),
    FreqWeekDay => ("FWD", "freq_week_day"),
    FreqWeekHour => ("FWH", "freq_week_hour"),
    NbQuiz => ("NQZ", "nb_quiz"),
    PropQuiz => ("PQZ", "prop_quiz"),
    IntervalVideoQuiz => ("IVQ", "interval_video_quiz"),
    SemesterRepartitionQuiz => ("SRQ", "semester_repartition_quiz"),
}

/// How a derived series is reduced to a scalar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    Mean,
    /// Sample standard deviation
    Std,
}

impl Reduction {
    pub fn apply(&self, values: &[f64]) -> f64 {
        match self {
            Reduction::Mean => stats::mean(values),
            Reduction::Std => stats::std(values),
        }
    }
}

use Column::{
    CurrentTime, Date, Duration, NewSpeed, NewTime, OldTime, ProblemId, TimeStamp, VideoId,
};

impl Feature {
    /// Columns the feature reads
    pub fn required_columns(&self) -> &'static [Column] {
        match self {
            Feature::TotalActions => &[],
            Feature::TotalPlays => &[Column::EventType],
            Feature::TotalViews | Feature::AvgWeeklyPropWatched | Feature::StdWeeklyPropWatched
            | Feature::AvgWeeklyPropReplayed | Feature::StdWeeklyPropReplayed => &[VideoId, Date],
            Feature::TotalUniqueVideos => &[VideoId],
            Feature::AvgWeeklyPropInterrupted | Feature::StdWeeklyPropInterrupted => {
                &[VideoId, Date, Column::EventType, TimeStamp, Duration]
            }
            Feature::FreqAllActions => &[VideoId, Date, Duration],
            Feature::FreqPlay
            | Feature::FreqPause
            | Feature::FreqSeekBackward
            | Feature::FreqSeekForward
            | Feature::FreqSpeedChange
            | Feature::FreqStop => &[Column::EventType],
            Feature::AvgPauseDuration | Feature::StdPauseDuration => {
                &[VideoId, Column::EventType, TimeStamp]
            }
            Feature::AvgSeekLength | Feature::StdSeekLength => {
                &[Column::EventType, OldTime, NewTime]
            }
            Feature::AvgTimeSpeedingUp | Feature::StdTimeSpeedingUp => {
                &[VideoId, TimeStamp, Column::EventType, CurrentTime, Duration, NewSpeed]
            }
            Feature::PeakDayHour
            | Feature::PeakWeekDay
            | Feature::WeeklySimilarity1
            | Feature::WeeklySimilarity2
            | Feature::WeeklySimilarity3
            | Feature::FreqDayHour
            | Feature::FreqWeekDay
            | Feature::FreqWeekHour => &[TimeStamp],
            Feature::NbQuiz | Feature::PropQuiz => &[Column::EventType, ProblemId],
            Feature::IntervalVideoQuiz => &[VideoId, Column::EventType, ProblemId, TimeStamp],
            Feature::SemesterRepartitionQuiz => &[Column::EventType, ProblemId, TimeStamp],
        }
    }

    /// Whether the feature joins against the course schedule
    pub fn needs_schedule(&self) -> bool {
        matches!(
            self,
            Feature::AvgWeeklyPropWatched
                | Feature::StdWeeklyPropWatched
                | Feature::AvgWeeklyPropReplayed
                | Feature::StdWeeklyPropReplayed
                | Feature::AvgWeeklyPropInterrupted
                | Feature::StdWeeklyPropInterrupted
                | Feature::PropQuiz
                | Feature::IntervalVideoQuiz
        )
    }

    /// Reduction of the underlying series, for series-backed features
    pub fn reduction(&self) -> Option<Reduction> {
        match self {
            Feature::AvgWeeklyPropWatched
            | Feature::AvgWeeklyPropReplayed
            | Feature::AvgWeeklyPropInterrupted
            | Feature::AvgPauseDuration
            | Feature::AvgSeekLength
            | Feature::AvgTimeSpeedingUp => Some(Reduction::Mean),
            Feature::StdWeeklyPropWatched
            | Feature::StdWeeklyPropReplayed
            | Feature::StdWeeklyPropInterrupted
            | Feature::StdPauseDuration
            | Feature::StdSeekLength
            | Feature::StdTimeSpeedingUp => Some(Reduction::Std),
            _ => None,
        }
    }

    /// Regularity/quiz short code, for the features that have one
    pub fn periodicity_code(&self) -> Option<FeatureCode> {
        match self {
            Feature::PeakDayHour => Some(FeatureCode::Pdh),
            Feature::PeakWeekDay => Some(FeatureCode::Pwd),
            Feature::WeeklySimilarity1 => Some(FeatureCode::Ws1),
            Feature::WeeklySimilarity2 => Some(FeatureCode::Ws2),
            Feature::WeeklySimilarity3 => Some(FeatureCode::Ws3),
            Feature::FreqDayHour => Some(FeatureCode::Fdh),
            Feature::FreqWeekDay => Some(FeatureCode::Fwd),
            Feature::FreqWeekHour => Some(FeatureCode::Fwh),
            Feature::NbQuiz => Some(FeatureCode::Nqz),
            Feature::PropQuiz => Some(FeatureCode::Pqz),
            Feature::IntervalVideoQuiz => Some(FeatureCode::Ivq),
            Feature::SemesterRepartitionQuiz => Some(FeatureCode::Srq),
            _ => None,
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Feature {
    type Err = ComputeError;

    /// Accepts either the short code (any case) or the descriptive name
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Feature::ALL
            .iter()
            .copied()
            .find(|f| f.code().eq_ignore_ascii_case(s) || f.name() == s)
            .ok_or_else(|| ComputeError::UnknownFeature(s.to_string()))
    }
}

/// Everything a feature computation reads, built once per user
pub struct FeatureContext<'t> {
    pub table: &'t EventTable,
    pub prepared: PreparedEvents<'t>,
    pub timeline: ActivityTimeline,
}

impl<'t> FeatureContext<'t> {
    pub fn new(table: &'t EventTable, offset: FixedOffset) -> Self {
        let prepared = table.prepare(offset);
        let timeline = ActivityTimeline::from_prepared(&prepared);
        Self {
            table,
            prepared,
            timeline,
        }
    }
}

/// Computes catalogue features for one user's event table
///
/// Stateless apart from its configuration: every call is a pure function of
/// the table it receives.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    config: FeatureConfig,
    offset: FixedOffset,
    schedule: Option<CourseSchedule>,
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureExtractor {
    /// Create an extractor with default thresholds, UTC bucketing and no schedule
    pub fn new() -> Self {
        Self {
            config: FeatureConfig::default(),
            offset: Utc.fix(),
            schedule: None,
        }
    }

    /// Create an extractor with a validated configuration
    pub fn with_config(config: FeatureConfig) -> Result<Self, ComputeError> {
        config.validate()?;
        let offset = config.offset()?;
        Ok(Self {
            config,
            offset,
            schedule: None,
        })
    }

    /// Attach the course schedule used by weekly-proportion and quiz features
    pub fn with_schedule(mut self, schedule: CourseSchedule) -> Self {
        self.schedule = Some(schedule);
        self
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    pub fn schedule(&self) -> Option<&CourseSchedule> {
        self.schedule.as_ref()
    }

    /// Prepare a table once for repeated feature evaluation
    pub fn context<'t>(&self, table: &'t EventTable) -> FeatureContext<'t> {
        FeatureContext::new(table, self.offset)
    }

    /// Check that a table can feed a feature without computing it
    pub fn check(&self, feature: Feature, table: &EventTable) -> Result<(), ComputeError> {
        table.require(feature.name(), feature.required_columns())?;
        if feature.needs_schedule() && self.schedule.is_none() {
            return Err(ComputeError::MissingSchedule(feature.name().to_string()));
        }
        Ok(())
    }

    /// Compute one feature from a raw table
    pub fn compute(&self, feature: Feature, table: &EventTable) -> Result<f64, ComputeError> {
        self.check(feature, table)?;
        let context = self.context(table);
        self.evaluate(feature, &context)
    }

    /// Compute one feature from a prepared context
    pub fn compute_in(&self, feature: Feature, context: &FeatureContext<'_>) -> Result<f64, ComputeError> {
        self.check(feature, context.table)?;
        self.evaluate(feature, context)
    }

    /// Evaluate a list of features on one prepared view of the table
    ///
    /// Failures are collected per feature instead of aborting the batch.
    pub fn extract(&self, features: &[Feature], table: &EventTable) -> FeatureReport {
        let context = self.context(table);
        let mut report = FeatureReport::new(table.user_id().map(str::to_string), table.len());
        for feature in features {
            report.record(*feature, self.compute_in(*feature, &context));
        }

        if let Some(schedule) = &self.schedule {
            if table.has_column(VideoId) {
                let prepared = &context.prepared;
                report.weekly.insert(
                    "weekly_prop_watched".to_string(),
                    series::weekly_prop_watched(prepared, schedule),
                );
                report.weekly.insert(
                    "weekly_prop_replayed".to_string(),
                    series::weekly_prop_replayed(prepared, schedule),
                );
            }
        }

        if !report.is_complete() {
            warn!(
                user = report.user_id.as_deref().unwrap_or("-"),
                failed = report.errors.len(),
                "some features could not be computed"
            );
        }
        report
    }

    /// Evaluate the whole catalogue
    pub fn extract_all(&self, table: &EventTable) -> FeatureReport {
        self.extract(Feature::ALL, table)
    }

    fn require_schedule(&self, feature: Feature) -> Result<&CourseSchedule, ComputeError> {
        self.schedule
            .as_ref()
            .ok_or_else(|| ComputeError::MissingSchedule(feature.name().to_string()))
    }

    fn evaluate(&self, feature: Feature, context: &FeatureContext<'_>) -> Result<f64, ComputeError> {
        let events = context.table.events();
        let prepared = &context.prepared;

        let value = match feature {
            Feature::TotalActions => aggregate::total_actions(events) as f64,
            Feature::TotalViews => aggregate::total_views(prepared) as f64,
            Feature::TotalPlays => aggregate::total_events(events, EventType::Play, false) as f64,
            Feature::TotalUniqueVideos => aggregate::total_unique_videos(events) as f64,
            Feature::AvgWeeklyPropWatched | Feature::StdWeeklyPropWatched => {
                let series = series::weekly_prop_watched(prepared, self.require_schedule(feature)?);
                reduce(feature, &WeeklyRatio::values(&series))
            }
            Feature::AvgWeeklyPropReplayed | Feature::StdWeeklyPropReplayed => {
                let series =
                    series::weekly_prop_replayed(prepared, self.require_schedule(feature)?);
                reduce(feature, &WeeklyRatio::values(&series))
            }
            Feature::AvgWeeklyPropInterrupted | Feature::StdWeeklyPropInterrupted => {
                let series = series::weekly_prop_interrupted(
                    prepared,
                    self.require_schedule(feature)?,
                    &self.config,
                );
                reduce(feature, &WeeklyRatio::values(&series))
            }
            Feature::FreqAllActions => {
                let hours = series::watched_hours(prepared);
                if hours == 0.0 {
                    0.0
                } else {
                    aggregate::total_actions(events) as f64 / hours
                }
            }
            Feature::FreqPlay => aggregate::action_ratio(events, EventType::Play, feature.name())?,
            Feature::FreqPause => {
                aggregate::action_ratio(events, EventType::Pause, feature.name())?
            }
            Feature::FreqSeekBackward => {
                aggregate::action_ratio(events, EventType::SeekBackward, feature.name())?
            }
            Feature::FreqSeekForward => {
                aggregate::action_ratio(events, EventType::SeekForward, feature.name())?
            }
            Feature::FreqSpeedChange => {
                aggregate::action_ratio(events, EventType::SpeedChange, feature.name())?
            }
            Feature::FreqStop => aggregate::action_ratio(events, EventType::Stop, feature.name())?,
            Feature::AvgPauseDuration | Feature::StdPauseDuration => {
                reduce(feature, &series::pause_duration(prepared, &self.config))
            }
            Feature::AvgSeekLength | Feature::StdSeekLength => {
                reduce(feature, &series::seek_length(events))
            }
            Feature::AvgTimeSpeedingUp | Feature::StdTimeSpeedingUp => {
                reduce(feature, &series::time_speeding_up(prepared))
            }
            Feature::PeakDayHour
            | Feature::PeakWeekDay
            | Feature::WeeklySimilarity1
            | Feature::WeeklySimilarity2
            | Feature::WeeklySimilarity3
            | Feature::FreqDayHour
            | Feature::FreqWeekDay
            | Feature::FreqWeekHour => {
                let code = feature
                    .periodicity_code()
                    .ok_or_else(|| ComputeError::UnknownFeature(feature.code().to_string()))?;
                periodicity::compute_feature(code, &context.timeline)?
            }
            Feature::NbQuiz => quiz::nb_quiz(prepared),
            Feature::PropQuiz => quiz::prop_quiz(prepared, self.require_schedule(feature)?),
            Feature::IntervalVideoQuiz => {
                quiz::interval_video_quiz(prepared, self.require_schedule(feature)?)
            }
            Feature::SemesterRepartitionQuiz => quiz::semester_repartition_quiz(prepared),
        };

        debug!(feature = feature.name(), value, "computed feature");
        Ok(value)
    }

    // ---- Primitive aggregators ----

    pub fn total_actions(&self, table: &EventTable) -> Result<f64, ComputeError> {
        self.compute(Feature::TotalActions, table)
    }

    /// Count of one event type, optionally one per video
    pub fn total_events(
        &self,
        table: &EventTable,
        event_type: EventType,
        unique: bool,
    ) -> Result<f64, ComputeError> {
        if unique {
            table.require("total_events", &[VideoId])?;
        }
        Ok(aggregate::total_events(table.events(), event_type, unique) as f64)
    }

    pub fn total_views(&self, table: &EventTable) -> Result<f64, ComputeError> {
        self.compute(Feature::TotalViews, table)
    }

    pub fn total_plays(&self, table: &EventTable) -> Result<f64, ComputeError> {
        self.compute(Feature::TotalPlays, table)
    }

    pub fn total_unique_videos(&self, table: &EventTable) -> Result<f64, ComputeError> {
        self.compute(Feature::TotalUniqueVideos, table)
    }

    // ---- Weekly proportions ----

    /// Per-week watched proportions, labelled with their semester week
    pub fn weekly_prop_watched_series(
        &self,
        table: &EventTable,
    ) -> Result<Vec<WeeklyRatio>, ComputeError> {
        self.check(Feature::AvgWeeklyPropWatched, table)?;
        let schedule = self.require_schedule(Feature::AvgWeeklyPropWatched)?;
        Ok(series::weekly_prop_watched(&self.context(table).prepared, schedule))
    }

    pub fn avg_weekly_prop_watched(&self, table: &EventTable) -> Result<f64, ComputeError> {
        self.compute(Feature::AvgWeeklyPropWatched, table)
    }

    pub fn std_weekly_prop_watched(&self, table: &EventTable) -> Result<f64, ComputeError> {
        self.compute(Feature::StdWeeklyPropWatched, table)
    }

    pub fn avg_weekly_prop_replayed(&self, table: &EventTable) -> Result<f64, ComputeError> {
        self.compute(Feature::AvgWeeklyPropReplayed, table)
    }

    pub fn std_weekly_prop_replayed(&self, table: &EventTable) -> Result<f64, ComputeError> {
        self.compute(Feature::StdWeeklyPropReplayed, table)
    }

    pub fn avg_weekly_prop_interrupted(&self, table: &EventTable) -> Result<f64, ComputeError> {
        self.compute(Feature::AvgWeeklyPropInterrupted, table)
    }

    pub fn std_weekly_prop_interrupted(&self, table: &EventTable) -> Result<f64, ComputeError> {
        self.compute(Feature::StdWeeklyPropInterrupted, table)
    }

    // ---- Action frequencies ----

    /// Actions per hour of watched content
    pub fn freq_all_actions(&self, table: &EventTable) -> Result<f64, ComputeError> {
        self.compute(Feature::FreqAllActions, table)
    }

    pub fn freq_play(&self, table: &EventTable) -> Result<f64, ComputeError> {
        self.compute(Feature::FreqPlay, table)
    }

    pub fn freq_pause(&self, table: &EventTable) -> Result<f64, ComputeError> {
        self.compute(Feature::FreqPause, table)
    }

    pub fn freq_seek_backward(&self, table: &EventTable) -> Result<f64, ComputeError> {
        self.compute(Feature::FreqSeekBackward, table)
    }

    pub fn freq_seek_forward(&self, table: &EventTable) -> Result<f64, ComputeError> {
        self.compute(Feature::FreqSeekForward, table)
    }

    pub fn freq_speed_change(&self, table: &EventTable) -> Result<f64, ComputeError> {
        self.compute(Feature::FreqSpeedChange, table)
    }

    pub fn freq_stop(&self, table: &EventTable) -> Result<f64, ComputeError> {
        self.compute(Feature::FreqStop, table)
    }

    // ---- Pauses, seeks and speed ----

    /// Raw pause-duration series (seconds)
    pub fn pause_duration_series(&self, table: &EventTable) -> Result<Vec<f64>, ComputeError> {
        self.check(Feature::AvgPauseDuration, table)?;
        Ok(series::pause_duration(&self.context(table).prepared, &self.config))
    }

    pub fn avg_pause_duration(&self, table: &EventTable) -> Result<f64, ComputeError> {
        self.compute(Feature::AvgPauseDuration, table)
    }

    pub fn std_pause_duration(&self, table: &EventTable) -> Result<f64, ComputeError> {
        self.compute(Feature::StdPauseDuration, table)
    }

    pub fn avg_seek_length(&self, table: &EventTable) -> Result<f64, ComputeError> {
        self.compute(Feature::AvgSeekLength, table)
    }

    pub fn std_seek_length(&self, table: &EventTable) -> Result<f64, ComputeError> {
        self.compute(Feature::StdSeekLength, table)
    }

    pub fn avg_time_speeding_up(&self, table: &EventTable) -> Result<f64, ComputeError> {
        self.compute(Feature::AvgTimeSpeedingUp, table)
    }

    pub fn std_time_speeding_up(&self, table: &EventTable) -> Result<f64, ComputeError> {
        self.compute(Feature::StdTimeSpeedingUp, table)
    }

    // ---- Regularity ----

    /// PDH: concentration of activity around one hour of the day
    pub fn peak_day_hour(&self, table: &EventTable) -> Result<f64, ComputeError> {
        self.compute(Feature::PeakDayHour, table)
    }

    /// PWD: concentration of activity around one day of the week
    pub fn peak_week_day(&self, table: &EventTable) -> Result<f64, ComputeError> {
        self.compute(Feature::PeakWeekDay, table)
    }

    /// WS1: same active weekdays across weeks
    pub fn weekly_similarity_1(&self, table: &EventTable) -> Result<f64, ComputeError> {
        self.compute(Feature::WeeklySimilarity1, table)
    }

    /// WS2: similar distribution of workload among weekdays across weeks
    pub fn weekly_similarity_2(&self, table: &EventTable) -> Result<f64, ComputeError> {
        self.compute(Feature::WeeklySimilarity2, table)
    }

    /// WS3: similar amount of activity per weekday across weeks
    pub fn weekly_similarity_3(&self, table: &EventTable) -> Result<f64, ComputeError> {
        self.compute(Feature::WeeklySimilarity3, table)
    }

    /// FDH: strength of a 24-sample period in the daily activity indicator
    pub fn freq_day_hour(&self, table: &EventTable) -> Result<f64, ComputeError> {
        self.compute(Feature::FreqDayHour, table)
    }

    /// FWD: strength of the weekly period in the daily activity indicator
    pub fn freq_week_day(&self, table: &EventTable) -> Result<f64, ComputeError> {
        self.compute(Feature::FreqWeekDay, table)
    }

    /// FWH: strength of a 168-sample period in the daily activity indicator
    pub fn freq_week_hour(&self, table: &EventTable) -> Result<f64, ComputeError> {
        self.compute(Feature::FreqWeekHour, table)
    }

    // ---- Quizzes ----

    pub fn nb_quiz(&self, table: &EventTable) -> Result<f64, ComputeError> {
        self.compute(Feature::NbQuiz, table)
    }

    pub fn prop_quiz(&self, table: &EventTable) -> Result<f64, ComputeError> {
        self.compute(Feature::PropQuiz, table)
    }

    pub fn interval_video_quiz(&self, table: &EventTable) -> Result<f64, ComputeError> {
        self.compute(Feature::IntervalVideoQuiz, table)
    }

    pub fn semester_repartition_quiz(&self, table: &EventTable) -> Result<f64, ComputeError> {
        self.compute(Feature::SemesterRepartitionQuiz, table)
    }
}

fn reduce(feature: Feature, values: &[f64]) -> f64 {
    feature
        .reduction()
        .map_or(f64::NAN, |reduction| reduction.apply(values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Event, WeekBucket};
    use chrono::{DateTime, Duration as Span, TimeZone, Utc};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap()
    }

    /// Play, pause after 5 min, resume 5.5 min later, stop; replay the next day
    fn scenario() -> Vec<Event> {
        let pause_at = start() + Span::minutes(5);
        let resume_at = pause_at + Span::seconds(330);
        vec![
            Event::video(EventType::Play, start(), "1").with_duration(900.0),
            Event::video(EventType::Pause, pause_at, "1"),
            Event::video(EventType::Play, resume_at, "1"),
            Event::video(EventType::Stop, resume_at + Span::minutes(3), "1"),
            Event::video(EventType::Play, start() + Span::days(1), "1"),
        ]
    }

    #[test]
    fn test_codes_and_names_are_unique() {
        let mut codes: Vec<&str> = Feature::ALL.iter().map(|f| f.code()).collect();
        let mut names: Vec<&str> = Feature::ALL.iter().map(|f| f.name()).collect();
        codes.sort();
        codes.dedup();
        names.sort();
        names.dedup();
        assert_eq!(codes.len(), Feature::ALL.len());
        assert_eq!(names.len(), Feature::ALL.len());
    }

    #[test]
    fn test_parse_by_code_or_name() {
        assert_eq!("WS2".parse::<Feature>().unwrap(), Feature::WeeklySimilarity2);
        assert_eq!("fwh".parse::<Feature>().unwrap(), Feature::FreqWeekHour);
        assert_eq!("freq_play".parse::<Feature>().unwrap(), Feature::FreqPlay);
        assert!("nope".parse::<Feature>().is_err());
        assert_eq!(Feature::PeakDayHour.periodicity_code(), Some(FeatureCode::Pdh));
        assert_eq!(Feature::FreqPlay.periodicity_code(), None);
    }

    #[test]
    fn test_codes_agree_with_dispatcher() {
        for feature in Feature::ALL {
            if let Some(code) = feature.periodicity_code() {
                assert_eq!(code.as_str(), feature.code());
            }
        }
        let mapped = Feature::ALL
            .iter()
            .filter(|f| f.periodicity_code().is_some())
            .count();
        assert_eq!(mapped, FeatureCode::ALL.len());
    }

    #[test]
    fn test_series_features_carry_their_reduction() {
        assert_eq!(Feature::AvgPauseDuration.reduction(), Some(Reduction::Mean));
        assert_eq!(Feature::StdWeeklyPropInterrupted.reduction(), Some(Reduction::Std));
        assert_eq!(Feature::TotalViews.reduction(), None);
        for feature in Feature::ALL {
            let is_series = feature.name().starts_with("avg_") || feature.name().starts_with("std_");
            assert_eq!(feature.reduction().is_some(), is_series, "{}", feature.name());
        }
        assert!(Reduction::Std.apply(&[1.0]).is_nan());
        assert_eq!(Reduction::Mean.apply(&[1.0, 3.0]), 2.0);
    }

    #[test]
    fn test_end_to_end_scenario() {
        let extractor = FeatureExtractor::new();
        let table = EventTable::new(scenario());

        assert_eq!(extractor.total_actions(&table).unwrap(), 5.0);
        assert_eq!(extractor.total_views(&table).unwrap(), 2.0);
        assert_eq!(extractor.pause_duration_series(&table).unwrap(), vec![330.0]);
        assert_eq!(extractor.avg_pause_duration(&table).unwrap(), 330.0);
        assert!(extractor.std_pause_duration(&table).unwrap().is_nan());
        assert!((extractor.freq_play(&table).unwrap() - 3.0 / 5.0).abs() < 1e-12);

        let first_day = EventTable::new(scenario().into_iter().take(4).collect());
        assert_eq!(extractor.freq_play(&first_day).unwrap(), 0.5);
        assert_eq!(extractor.total_views(&first_day).unwrap(), 1.0);
    }

    #[test]
    fn test_total_events() {
        let extractor = FeatureExtractor::new();
        let table = EventTable::new(scenario());
        assert_eq!(extractor.total_events(&table, EventType::Play, false).unwrap(), 3.0);
        assert_eq!(extractor.total_events(&table, EventType::Play, true).unwrap(), 1.0);
        assert_eq!(extractor.total_plays(&table).unwrap(), 3.0);
    }

    #[test]
    fn test_extractor_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FeatureExtractor>();
    }

    #[test]
    fn test_ratio_on_empty_table_is_division_by_zero() {
        let extractor = FeatureExtractor::new();
        let table = EventTable::new(Vec::new());
        assert!(matches!(
            extractor.freq_pause(&table),
            Err(ComputeError::DivisionByZero(_))
        ));
        assert_eq!(extractor.total_actions(&table).unwrap(), 0.0);
    }

    #[test]
    fn test_missing_columns_fail_fast() {
        let extractor = FeatureExtractor::new();
        let table = EventTable::new(scenario());
        let err = extractor.avg_seek_length(&table).unwrap_err();
        match err {
            ComputeError::MissingColumns { feature, columns } => {
                assert_eq!(feature, "avg_seek_length");
                assert_eq!(columns, "OldTime, NewTime");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_schedule_required() {
        let extractor = FeatureExtractor::new();
        let table = EventTable::new(scenario());
        assert!(matches!(
            extractor.avg_weekly_prop_watched(&table),
            Err(ComputeError::MissingSchedule(_))
        ));

        let extractor = extractor.with_schedule(
            CourseSchedule::new()
                .assign(WeekBucket::new(2024, 10), ["1", "2"])
                .assign(WeekBucket::new(2024, 11), ["3"]),
        );
        assert_eq!(extractor.avg_weekly_prop_watched(&table).unwrap(), 0.25);
        assert!((extractor.std_weekly_prop_watched(&table).unwrap() - 0.5f64.sqrt() / 2.0).abs() < 1e-12);
        assert_eq!(extractor.avg_weekly_prop_replayed(&table).unwrap(), 0.25);

        let series = extractor.weekly_prop_watched_series(&table).unwrap();
        assert_eq!(series[1].semester_week, Some(1));
    }

    #[test]
    fn test_regularity_through_facade() {
        let extractor = FeatureExtractor::new();
        let events: Vec<Event> = (0..4)
            .map(|w| Event::video(EventType::Play, start() + Span::weeks(w) + Span::hours(4), "v"))
            .collect();
        let table = EventTable::new(events);

        assert_eq!(extractor.peak_day_hour(&table).unwrap(), 1.0);
        assert_eq!(extractor.peak_week_day(&table).unwrap(), 1.0);
        assert_eq!(extractor.weekly_similarity_1(&table).unwrap(), 1.0);
        assert!((extractor.freq_week_day(&table).unwrap() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_utc_offset_shifts_peak_hour() {
        let config = FeatureConfig::default().with_utc_offset_minutes(120);
        let extractor = FeatureExtractor::with_config(config).unwrap();
        let table = EventTable::new(vec![
            Event::video(EventType::Play, start(), "v"),
            Event::video(EventType::Play, start() + Span::days(1), "v"),
        ]);
        let context = extractor.context(&table);
        assert_eq!(context.timeline.hour_histogram()[12], 2.0);
        assert_eq!(extractor.compute_in(Feature::PeakDayHour, &context).unwrap(), 1.0);
    }

    #[test]
    fn test_quiz_features_through_facade() {
        let extractor = FeatureExtractor::new()
            .with_schedule(CourseSchedule::new().quiz("q1", Some("v1")).quiz("q2", None));
        let table = EventTable::new(vec![
            Event::video(EventType::Play, start(), "v1"),
            Event::quiz(EventType::QuizCompleted, start() + Span::minutes(45), "q1"),
        ]);
        assert_eq!(extractor.nb_quiz(&table).unwrap(), 1.0);
        assert_eq!(extractor.prop_quiz(&table).unwrap(), 0.5);
        assert_eq!(extractor.interval_video_quiz(&table).unwrap(), 0.0);
        assert!(extractor.semester_repartition_quiz(&table).unwrap().is_nan());
    }

    #[test]
    fn test_extract_all_collects_values_and_errors() {
        let extractor = FeatureExtractor::new();
        let table = EventTable::new(
            scenario()
                .into_iter()
                .map(|e| e.with_user_id("learner-7"))
                .collect(),
        );
        let report = extractor.extract_all(&table);

        assert_eq!(report.user_id.as_deref(), Some("learner-7"));
        assert_eq!(report.event_count, 5);
        assert_eq!(report.value(Feature::TotalViews), Some(2.0));
        assert_eq!(report.value(Feature::AvgPauseDuration), Some(330.0));
        assert_eq!(report.values.get("std_pause_duration"), Some(&None));
        assert!(report.errors.contains_key("avg_seek_length"));
        assert!(report.errors.contains_key("prop_quiz"));
        assert_eq!(report.values.len() + report.errors.len(), Feature::ALL.len());
        assert!(report.weekly.is_empty());
    }
}
