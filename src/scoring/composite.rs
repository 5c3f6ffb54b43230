//! Weighted composite score across pollutants.

use crate::scoring::{PollutantKind, ScoreBand, ScoreTables, round_to};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use tracing::warn;

/// Sub-scores below this value mark a pollutant as problematic.
pub const PROBLEMATIC_BELOW: u8 = 60;

const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Contribution of each pollutant to the global score.
///
/// Temperature has no field: it is scored for reporting but never weighted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Weights {
    pub co2: f64,
    pub pm25: f64,
    pub tvoc: f64,
    pub humidity: f64,
}

impl Weights {
    pub const STANDARD: Weights = Weights {
        co2: 0.35,
        pm25: 0.30,
        tvoc: 0.25,
        humidity: 0.10,
    };

    /// Weight of `kind`, or `None` for kinds excluded from the composite.
    pub fn weight(&self, kind: PollutantKind) -> Option<f64> {
        match kind {
            PollutantKind::Co2 => Some(self.co2),
            PollutantKind::Pm25 => Some(self.pm25),
            PollutantKind::Tvoc => Some(self.tvoc),
            PollutantKind::Humidity => Some(self.humidity),
            PollutantKind::Temperature => None,
        }
    }

    pub fn total(&self) -> f64 {
        self.co2 + self.pm25 + self.tvoc + self.humidity
    }

    pub fn is_normalized(&self) -> bool {
        (self.total() - 1.0).abs() <= WEIGHT_TOLERANCE
    }
}

impl Default for Weights {
    fn default() -> Self {
        Self::STANDARD
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GlobalLevel {
    Good,
    Moderate,
    Poor,
    VeryPoor,
}

impl GlobalLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            GlobalLevel::Good
        } else if score >= 60.0 {
            GlobalLevel::Moderate
        } else if score >= 40.0 {
            GlobalLevel::Poor
        } else {
            GlobalLevel::VeryPoor
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GlobalLevel::Good => "good",
            GlobalLevel::Moderate => "moderate",
            GlobalLevel::Poor => "poor",
            GlobalLevel::VeryPoor => "very_poor",
        }
    }
}

impl fmt::Display for GlobalLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PollutantDetail {
    pub value: f64,
    pub score: u8,
    pub level: ScoreBand,
    pub weight: f64,
}

/// A pollutant whose sub-score fell below [`PROBLEMATIC_BELOW`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProblematicPollutant {
    pub pollutant: PollutantKind,
    pub value: f64,
    pub score: u8,
    pub level: ScoreBand,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeScoreResult {
    pub global_score: f64,
    pub global_level: GlobalLevel,
    pub pollutant_details: BTreeMap<PollutantKind, PollutantDetail>,
    pub problematic: Vec<ProblematicPollutant>,
}

/// Scores every recognized reading and folds them into one weighted total.
///
/// Unknown keys and repeated kinds are skipped with a warning. Missing
/// pollutants lower the total; their weight is not redistributed.
pub fn aggregate<I, K>(tables: &ScoreTables, weights: &Weights, readings: I) -> CompositeScoreResult
where
    I: IntoIterator<Item = (K, f64)>,
    K: AsRef<str>,
{
    let mut weighted_score = 0.0;
    let mut pollutant_details = BTreeMap::new();
    let mut problematic = Vec::new();
    let mut seen = HashSet::new();

    for (key, value) in readings {
        let key = key.as_ref();
        let kind = match key.parse::<PollutantKind>() {
            Ok(kind) => kind,
            Err(err) => {
                warn!(key = key, error = %err, "Skipping unrecognized pollutant reading");
                continue;
            }
        };
        if !seen.insert(kind) {
            warn!(pollutant = %kind, "Skipping duplicate pollutant reading");
            continue;
        }
        let Some(weight) = weights.weight(kind) else {
            continue;
        };

        let level = tables.level(kind, value);
        let score = level.score();
        weighted_score += f64::from(score) * weight;

        pollutant_details.insert(
            kind,
            PollutantDetail {
                value: round_to(value, 2),
                score,
                level,
                weight,
            },
        );

        if score < PROBLEMATIC_BELOW {
            problematic.push(ProblematicPollutant {
                pollutant: kind,
                value,
                score,
                level,
            });
        }
    }

    CompositeScoreResult {
        global_score: round_to(weighted_score, 1),
        global_level: GlobalLevel::from_score(weighted_score),
        pollutant_details,
        problematic,
    }
}
