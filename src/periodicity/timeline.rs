//! Activity timeline shared by every periodicity feature

use crate::calendar::{self, DAYS_PER_WEEK, HOURS_PER_DAY};
use crate::schema::PreparedEvents;
use crate::types::WeekBucket;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

/// Local (day, hour) of every event of one user, chronologically
#[derive(Debug, Clone, Default)]
pub struct ActivityTimeline {
    moments: Vec<(NaiveDate, usize)>,
}

impl ActivityTimeline {
    /// Build the timeline from a prepared view
    pub fn from_prepared(prepared: &PreparedEvents<'_>) -> Self {
        let offset = prepared.offset();
        Self {
            moments: prepared
                .rows()
                .iter()
                .map(|row| (row.day, calendar::hour(&row.event.timestamp, &offset)))
                .collect(),
        }
    }

    /// Build directly from local (day, hour) pairs
    ///
    /// Pairs with an hour outside 0-23 are dropped.
    pub fn from_moments(mut moments: Vec<(NaiveDate, usize)>) -> Self {
        let before = moments.len();
        moments.retain(|(_, hour)| *hour < HOURS_PER_DAY);
        if moments.len() < before {
            warn!(dropped = before - moments.len(), "moments with an out-of-range hour ignored");
        }
        moments.sort();
        Self { moments }
    }

    pub fn len(&self) -> usize {
        self.moments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moments.is_empty()
    }

    pub fn first_day(&self) -> Option<NaiveDate> {
        self.moments.iter().map(|(day, _)| *day).min()
    }

    pub fn last_day(&self) -> Option<NaiveDate> {
        self.moments.iter().map(|(day, _)| *day).max()
    }

    /// Event counts per hour of day
    pub fn hour_histogram(&self) -> [f64; HOURS_PER_DAY] {
        let mut bins = [0.0; HOURS_PER_DAY];
        for (_, hour) in &self.moments {
            bins[*hour] += 1.0;
        }
        bins
    }

    /// Event counts per weekday, Monday first
    pub fn weekday_histogram(&self) -> [f64; DAYS_PER_WEEK] {
        let mut bins = [0.0; DAYS_PER_WEEK];
        for (day, _) in &self.moments {
            bins[calendar::weekday(*day)] += 1.0;
        }
        bins
    }

    /// Weekday event-count profile of every week spanned by the activity
    ///
    /// Weeks between the first and last active week with no activity are
    /// included as all-zero profiles.
    pub fn weekly_profiles(&self) -> BTreeMap<WeekBucket, [f64; DAYS_PER_WEEK]> {
        let (Some(first), Some(last)) = (self.first_day(), self.last_day()) else {
            return BTreeMap::new();
        };
        let mut profiles: BTreeMap<WeekBucket, [f64; DAYS_PER_WEEK]> = calendar::weeks_spanned(first, last)
            .into_iter()
            .map(|week| (week, [0.0; DAYS_PER_WEEK]))
            .collect();
        for (day, _) in &self.moments {
            if let Some(profile) = profiles.get_mut(&calendar::week_bucket(*day)) {
                profile[calendar::weekday(*day)] += 1.0;
            }
        }
        profiles
    }

    /// 1.0 for each day with at least one event, 0.0 otherwise, from the first to the last active day
    pub fn daily_indicator(&self) -> Vec<f64> {
        let (Some(first), Some(last)) = (self.first_day(), self.last_day()) else {
            return Vec::new();
        };
        let active: BTreeSet<NaiveDate> = self.moments.iter().map(|(day, _)| *day).collect();
        first
            .iter_days()
            .take_while(|day| *day <= last)
            .map(|day| if active.contains(&day) { 1.0 } else { 0.0 })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, month, day).unwrap()
    }

    #[test]
    fn test_histograms() {
        let timeline = ActivityTimeline::from_moments(vec![
            (date(3, 4), 14),
            (date(3, 4), 14),
            (date(3, 10), 9),
        ]);
        let hours = timeline.hour_histogram();
        assert_eq!(hours[14], 2.0);
        assert_eq!(hours[9], 1.0);
        let weekdays = timeline.weekday_histogram();
        assert_eq!(weekdays[0], 2.0); // Monday
        assert_eq!(weekdays[6], 1.0); // Sunday
    }

    #[test]
    fn test_out_of_range_hours_are_dropped() {
        let timeline = ActivityTimeline::from_moments(vec![(date(3, 4), 24), (date(3, 4), 23)]);
        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline.hour_histogram()[23], 1.0);
        assert_eq!(timeline.hour_histogram().iter().sum::<f64>(), 1.0);
    }

    #[test]
    fn test_weekly_profiles_include_gaps() {
        let timeline = ActivityTimeline::from_moments(vec![(date(3, 4), 10), (date(3, 20), 10)]);
        let profiles = timeline.weekly_profiles();
        assert_eq!(profiles.len(), 3);
        assert_eq!(profiles[&WeekBucket::new(2024, 11)], [0.0; 7]);
        assert_eq!(profiles[&WeekBucket::new(2024, 12)][2], 1.0); // Wednesday
    }

    #[test]
    fn test_daily_indicator() {
        let timeline = ActivityTimeline::from_moments(vec![
            (date(3, 4), 10),
            (date(3, 4), 11),
            (date(3, 7), 10),
        ]);
        assert_eq!(timeline.daily_indicator(), vec![1.0, 0.0, 0.0, 1.0]);
        assert!(ActivityTimeline::default().daily_indicator().is_empty());
    }
}
