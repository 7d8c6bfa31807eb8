//! Periodicity feature engine
//!
//! Regularity features (peak hour, peak weekday, weekly similarity, Fourier
//! periodicity) evaluated through one dispatcher over declarative
//! definitions. Quiz features share the short-code namespace but are not
//! timeline features; asking the dispatcher for them is an error.

pub mod definition;
pub mod fourier;
pub mod timeline;

pub use definition::{
    FeatureDefinition, FourierPeriodicity, Granularity, PeakConcentration, SimilarityMode,
    TimelineFeature, WeeklySimilarity,
};
pub use timeline::ActivityTimeline;

use crate::error::ComputeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Hours in a week, the period of FWH
pub const HOURS_PER_WEEK: f64 = 7.0 * 24.0;

/// Short codes of the regularity and quiz features
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FeatureCode {
    Pdh,
    Pwd,
    Ws1,
    Ws2,
    Ws3,
    Fdh,
    Fwd,
    Fwh,
    Nqz,
    Pqz,
    Ivq,
    Srq,
}

impl FeatureCode {
    pub const ALL: [FeatureCode; 12] = [
        FeatureCode::Pdh,
        FeatureCode::Pwd,
        FeatureCode::Ws1,
        FeatureCode::Ws2,
        FeatureCode::Ws3,
        FeatureCode::Fdh,
        FeatureCode::Fwd,
        FeatureCode::Fwh,
        FeatureCode::Nqz,
        FeatureCode::Pqz,
        FeatureCode::Ivq,
        FeatureCode::Srq,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureCode::Pdh => "PDH",
            FeatureCode::Pwd => "PWD",
            FeatureCode::Ws1 => "WS1",
            FeatureCode::Ws2 => "WS2",
            FeatureCode::Ws3 => "WS3",
            FeatureCode::Fdh => "FDH",
            FeatureCode::Fwd => "FWD",
            FeatureCode::Fwh => "FWH",
            FeatureCode::Nqz => "NQZ",
            FeatureCode::Pqz => "PQZ",
            FeatureCode::Ivq => "IVQ",
            FeatureCode::Srq => "SRQ",
        }
    }

    /// Definition evaluated by the dispatcher, `None` for the quiz family
    pub fn definition(&self) -> Option<FeatureDefinition> {
        let definition = match self {
            FeatureCode::Pdh => FeatureDefinition::PeakConcentration(PeakConcentration {
                granularity: Granularity::HourOfDay,
            }),
            FeatureCode::Pwd => FeatureDefinition::PeakConcentration(PeakConcentration {
                granularity: Granularity::DayOfWeek,
            }),
            FeatureCode::Ws1 => FeatureDefinition::WeeklySimilarity(WeeklySimilarity {
                mode: SimilarityMode::ActiveDays,
            }),
            FeatureCode::Ws2 => FeatureDefinition::WeeklySimilarity(WeeklySimilarity {
                mode: SimilarityMode::NormalizedProfile,
            }),
            FeatureCode::Ws3 => FeatureDefinition::WeeklySimilarity(WeeklySimilarity {
                mode: SimilarityMode::RawProfile,
            }),
            FeatureCode::Fdh => {
                FeatureDefinition::FourierPeriodicity(FourierPeriodicity { period: 24.0 })
            }
            FeatureCode::Fwd => {
                FeatureDefinition::FourierPeriodicity(FourierPeriodicity { period: 7.0 })
            }
            FeatureCode::Fwh => FeatureDefinition::FourierPeriodicity(FourierPeriodicity {
                period: HOURS_PER_WEEK,
            }),
            FeatureCode::Nqz | FeatureCode::Pqz | FeatureCode::Ivq | FeatureCode::Srq => {
                return None
            }
        };
        Some(definition)
    }
}

impl fmt::Display for FeatureCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeatureCode {
    type Err = ComputeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FeatureCode::ALL
            .into_iter()
            .find(|code| code.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ComputeError::UnknownFeature(s.to_string()))
    }
}

impl TryFrom<FeatureCode> for FeatureDefinition {
    type Error = ComputeError;

    fn try_from(code: FeatureCode) -> Result<Self, Self::Error> {
        code.definition()
            .ok_or_else(|| ComputeError::UnsupportedFeature(code.as_str().to_string()))
    }
}

/// Evaluate a feature code against a user's timeline
///
/// Quiz codes (NQZ, PQZ, IVQ, SRQ) fail with `UnsupportedFeature`: they are
/// computed by [`crate::quiz`].
pub fn compute_feature(code: FeatureCode, timeline: &ActivityTimeline) -> Result<f64, ComputeError> {
    let definition = FeatureDefinition::try_from(code)?;
    Ok(definition.evaluate(timeline))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_code_parsing() {
        assert_eq!("ws2".parse::<FeatureCode>().unwrap(), FeatureCode::Ws2);
        assert_eq!("FWH".parse::<FeatureCode>().unwrap(), FeatureCode::Fwh);
        assert!(matches!(
            "XYZ".parse::<FeatureCode>(),
            Err(ComputeError::UnknownFeature(_))
        ));
        assert_eq!(serde_json::to_string(&FeatureCode::Pdh).unwrap(), "\"PDH\"");
    }

    #[test]
    fn test_dispatch() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let timeline = ActivityTimeline::from_moments(vec![(day, 14), (day, 14)]);
        assert_eq!(compute_feature(FeatureCode::Pdh, &timeline).unwrap(), 1.0);
        assert_eq!(compute_feature(FeatureCode::Fwd, &timeline).unwrap(), 1.0);
    }

    #[test]
    fn test_quiz_codes_are_rejected() {
        let timeline = ActivityTimeline::default();
        for code in [FeatureCode::Nqz, FeatureCode::Pqz, FeatureCode::Ivq, FeatureCode::Srq] {
            assert!(matches!(
                compute_feature(code, &timeline),
                Err(ComputeError::UnsupportedFeature(_))
            ));
        }
    }
}
