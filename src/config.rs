//! Feature engine configuration
//!
//! Thresholds used by the interval and interruption builders, plus the fixed
//! UTC offset in which calendar buckets (day, week, hour) are derived.

use crate::error::ComputeError;
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

/// Pauses at or above this length are treated as abandonments (8 minutes)
pub const DEFAULT_LONG_BREAK_SEC: f64 = 480.0;

/// Pauses within this window before the nominal end of a view count as finishing it
pub const DEFAULT_END_WINDOW_SEC: f64 = 60.0;

/// Upper bound for both thresholds (one year)
pub const MAX_THRESHOLD_SEC: f64 = 365.0 * 24.0 * 3600.0;

/// Configuration shared by every feature computation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Long-break threshold in seconds
    pub long_break_sec: f64,
    /// Length of the "last minute" window in seconds
    pub end_window_sec: f64,
    /// Offset from UTC, in minutes, used for day/hour/week bucketing
    pub utc_offset_minutes: i32,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            long_break_sec: DEFAULT_LONG_BREAK_SEC,
            end_window_sec: DEFAULT_END_WINDOW_SEC,
            utc_offset_minutes: 0,
        }
    }
}

impl FeatureConfig {
    /// Load and validate a configuration from JSON; missing fields take defaults
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let config: FeatureConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_utc_offset_minutes(mut self, minutes: i32) -> Self {
        self.utc_offset_minutes = minutes;
        self
    }

    pub fn validate(&self) -> Result<(), ComputeError> {
        if !(self.long_break_sec > 0.0 && self.long_break_sec <= MAX_THRESHOLD_SEC) {
            return Err(ComputeError::InvalidConfig(format!(
                "long_break_sec must be in (0, {}], got {}",
                MAX_THRESHOLD_SEC, self.long_break_sec
            )));
        }
        if !(self.end_window_sec >= 0.0 && self.end_window_sec <= MAX_THRESHOLD_SEC) {
            return Err(ComputeError::InvalidConfig(format!(
                "end_window_sec must be in [0, {}], got {}",
                MAX_THRESHOLD_SEC, self.end_window_sec
            )));
        }
        self.offset().map(|_| ())
    }

    /// The configured offset as a chrono timezone
    pub fn offset(&self) -> Result<FixedOffset, ComputeError> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or_else(|| {
            ComputeError::InvalidConfig(format!(
                "utc_offset_minutes out of range: {}",
                self.utc_offset_minutes
            ))
        })
    }
}
