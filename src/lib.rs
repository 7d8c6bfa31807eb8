//! Lecture Flux - behavioral feature engine for online-course video logs
//!
//! Flux turns one learner's clickstream (video plays, pauses, seeks, speed
//! changes, quiz completions) into scalar behavioral features through a
//! deterministic pipeline: event table → prepared view → derived series →
//! reduction.
//!
//! ## Modules
//!
//! - **Aggregates**: counts and ratios read straight off the table
//! - **Series**: weekly proportions, pause/seek/speed interval series
//! - **Periodicity**: regularity features over the activity timeline
//! - **Quiz**: quiz completion features
//! - **Catalogue**: the `Feature` catalogue and the `FeatureExtractor` facade

pub mod aggregate;
pub mod calendar;
pub mod catalogue;
pub mod config;
pub mod error;
pub mod periodicity;
pub mod quiz;
pub mod report;
pub mod schema;
pub mod series;
pub mod stats;
pub mod types;

pub use catalogue::{Feature, FeatureContext, FeatureExtractor, Reduction};
pub use config::FeatureConfig;
pub use error::ComputeError;
pub use periodicity::{compute_feature, ActivityTimeline, FeatureCode};
pub use report::FeatureReport;
pub use schema::{EventTable, EventTableAdapter};
pub use types::{Column, CourseSchedule, Event, EventType, WeekBucket};

/// Engine version stamped on every report
pub const FEATURES_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "lecture-flux";
