//! Feature reports
//!
//! Serializable result of evaluating a set of catalogue features for one
//! user. Undefined statistics (NaN) are reported as `null`; features that
//! could not be computed are listed under `errors` with their message.

use crate::catalogue::Feature;
use crate::error::ComputeError;
use crate::series::WeeklyRatio;
use crate::{FEATURES_VERSION, PRODUCER_NAME};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Who produced a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
}

impl Default for ReportProducer {
    fn default() -> Self {
        Self {
            name: PRODUCER_NAME.to_string(),
            version: FEATURES_VERSION.to_string(),
        }
    }
}

/// Feature values of one user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureReport {
    pub report_id: String,
    pub producer: ReportProducer,
    pub computed_at: DateTime<Utc>,
    pub user_id: Option<String>,
    pub event_count: usize,
    /// Feature name to value; `None` when the statistic is undefined
    pub values: BTreeMap<String, Option<f64>>,
    /// Feature name to the reason it could not be computed
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: BTreeMap<String, String>,
    /// Per-week proportion series, keyed by series name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub weekly: BTreeMap<String, Vec<WeeklyRatio>>,
}

impl FeatureReport {
    pub fn new(user_id: Option<String>, event_count: usize) -> Self {
        Self {
            report_id: Uuid::new_v4().to_string(),
            producer: ReportProducer::default(),
            computed_at: Utc::now(),
            user_id,
            event_count,
            values: BTreeMap::new(),
            errors: BTreeMap::new(),
            weekly: BTreeMap::new(),
        }
    }

    /// Store the outcome of one feature computation
    pub fn record(&mut self, feature: Feature, outcome: Result<f64, ComputeError>) {
        let name = feature.name().to_string();
        match outcome {
            Ok(value) => {
                self.values.insert(name, value.is_finite().then_some(value));
            }
            Err(err) => {
                self.errors.insert(name, err.to_string());
            }
        }
    }

    /// Value of a feature; `None` when missing, undefined or failed
    pub fn value(&self, feature: Feature) -> Option<f64> {
        self.values.get(feature.name()).copied().flatten()
    }

    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn to_json(&self) -> Result<String, ComputeError> {
        serde_json::to_string_pretty(self).map_err(ComputeError::JsonError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_maps_nan_to_null() {
        let mut report = FeatureReport::new(Some("u1".to_string()), 3);
        report.record(Feature::TotalActions, Ok(3.0));
        report.record(Feature::StdPauseDuration, Ok(f64::NAN));
        report.record(
            Feature::FreqPlay,
            Err(ComputeError::DivisionByZero("freq_play".to_string())),
        );

        assert_eq!(report.value(Feature::TotalActions), Some(3.0));
        assert_eq!(report.values.get("std_pause_duration"), Some(&None));
        assert!(!report.is_complete());

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert!(json["values"]["std_pause_duration"].is_null());
        assert_eq!(json["producer"]["name"], PRODUCER_NAME);
        assert!(json["errors"]["freq_play"]
            .as_str()
            .unwrap()
            .contains("Division by zero"));
        assert!(json.get("weekly").is_none());
    }

    #[test]
    fn test_report_ids_are_unique() {
        let a = FeatureReport::new(None, 0);
        let b = FeatureReport::new(None, 0);
        assert_ne!(a.report_id, b.report_id);
    }
}
