//! Derived series builders
//!
//! Each builder turns a prepared event table into a per-unit series (per week,
//! per pause, per seek, per video) from which a feature takes its mean or
//! standard deviation.

pub mod intervals;
pub mod views;

pub use intervals::{pause_duration, seek_length, time_speeding_up};
pub use views::{
    interrupted_views, watched_hours, weekly_prop_interrupted, weekly_prop_replayed,
    weekly_prop_watched, WeeklyRatio,
};
