//! Declarative periodicity feature definitions
//!
//! Every definition evaluates to one scalar over an [`ActivityTimeline`].

use crate::calendar::DAYS_PER_WEEK;
use crate::periodicity::fourier::dft_magnitude;
use crate::periodicity::timeline::ActivityTimeline;
use crate::stats;
use serde::{Deserialize, Serialize};

/// A feature computed from an activity timeline
pub trait TimelineFeature {
    fn evaluate(&self, timeline: &ActivityTimeline) -> f64;
}

/// Histogram resolution for peak concentration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    HourOfDay,
    DayOfWeek,
}

/// Share of activity falling in the busiest histogram bin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeakConcentration {
    pub granularity: Granularity,
}

impl TimelineFeature for PeakConcentration {
    fn evaluate(&self, timeline: &ActivityTimeline) -> f64 {
        let bins: Vec<f64> = match self.granularity {
            Granularity::HourOfDay => timeline.hour_histogram().to_vec(),
            Granularity::DayOfWeek => timeline.weekday_histogram().to_vec(),
        };
        let total: f64 = bins.iter().sum();
        if total == 0.0 {
            return f64::NAN;
        }
        bins.iter().copied().fold(0.0, f64::max) / total
    }
}

/// How week profiles are compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMode {
    /// Jaccard overlap of the sets of active weekdays
    ActiveDays,
    /// Bray-Curtis similarity of unit-sum weekday profiles
    NormalizedProfile,
    /// Bray-Curtis similarity of raw weekday counts
    RawProfile,
}

/// Mean pairwise similarity of weekly activity profiles
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeeklySimilarity {
    pub mode: SimilarityMode,
}

fn is_active(profile: &[f64; DAYS_PER_WEEK]) -> bool {
    profile.iter().any(|count| *count > 0.0)
}

fn jaccard(a: &[f64; DAYS_PER_WEEK], b: &[f64; DAYS_PER_WEEK]) -> f64 {
    let both = a.iter().zip(b).filter(|(x, y)| **x > 0.0 && **y > 0.0).count();
    let either = a.iter().zip(b).filter(|(x, y)| **x > 0.0 || **y > 0.0).count();
    both as f64 / either as f64
}

fn bray_curtis(a: &[f64; DAYS_PER_WEEK], b: &[f64; DAYS_PER_WEEK]) -> f64 {
    let distance: f64 = a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum();
    let mass: f64 = a.iter().zip(b).map(|(x, y)| x + y).sum();
    1.0 - distance / mass
}

fn normalized(profile: &[f64; DAYS_PER_WEEK]) -> [f64; DAYS_PER_WEEK] {
    let total: f64 = profile.iter().sum();
    let mut shares = *profile;
    for share in shares.iter_mut() {
        *share /= total;
    }
    shares
}

impl TimelineFeature for WeeklySimilarity {
    fn evaluate(&self, timeline: &ActivityTimeline) -> f64 {
        let mut profiles: Vec<[f64; DAYS_PER_WEEK]> =
            timeline.weekly_profiles().into_values().collect();
        if self.mode == SimilarityMode::NormalizedProfile {
            profiles = profiles
                .iter()
                .filter(|p| is_active(p))
                .map(normalized)
                .collect();
        }

        let mut similarities = Vec::new();
        for (i, a) in profiles.iter().enumerate() {
            for b in &profiles[i + 1..] {
                if !is_active(a) && !is_active(b) {
                    continue;
                }
                similarities.push(match self.mode {
                    SimilarityMode::ActiveDays => jaccard(a, b),
                    SimilarityMode::NormalizedProfile | SimilarityMode::RawProfile => {
                        bray_curtis(a, b)
                    }
                });
            }
        }
        stats::mean(&similarities)
    }
}

/// DFT magnitude of the daily activity indicator at one period
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FourierPeriodicity {
    /// Period in days (samples); the frequency evaluated is `1 / period`
    pub period: f64,
}

impl TimelineFeature for FourierPeriodicity {
    fn evaluate(&self, timeline: &ActivityTimeline) -> f64 {
        dft_magnitude(&timeline.daily_indicator(), 1.0 / self.period)
    }
}

/// Tagged union of every definition the generic dispatcher understands
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureDefinition {
    PeakConcentration(PeakConcentration),
    WeeklySimilarity(WeeklySimilarity),
    FourierPeriodicity(FourierPeriodicity),
}

impl TimelineFeature for FeatureDefinition {
    fn evaluate(&self, timeline: &ActivityTimeline) -> f64 {
        match self {
            FeatureDefinition::PeakConcentration(d) => d.evaluate(timeline),
            FeatureDefinition::WeeklySimilarity(d) => d.evaluate(timeline),
            FeatureDefinition::FourierPeriodicity(d) => d.evaluate(timeline),
        }
    }
}
