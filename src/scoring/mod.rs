//! Per-pollutant scoring.
//!
//! Every recognized pollutant maps a measured value onto one of five
//! [`ScoreBand`]s, each worth a fixed sub-score. The band tables are plain
//! data so a deployment can swap them through the `[engine]` config section.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub mod composite;
pub mod trend;

/// Pollutants the engine recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollutantKind {
    Co2,
    Pm25,
    Tvoc,
    Humidity,
    Temperature,
}

impl PollutantKind {
    pub const ALL: [PollutantKind; 5] = [
        PollutantKind::Co2,
        PollutantKind::Pm25,
        PollutantKind::Tvoc,
        PollutantKind::Humidity,
        PollutantKind::Temperature,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PollutantKind::Co2 => "co2",
            PollutantKind::Pm25 => "pm25",
            PollutantKind::Tvoc => "tvoc",
            PollutantKind::Humidity => "humidity",
            PollutantKind::Temperature => "temperature",
        }
    }
}

impl fmt::Display for PollutantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown pollutant: {0}")]
pub struct UnknownPollutant(pub String);

impl FromStr for PollutantKind {
    type Err = UnknownPollutant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        PollutantKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == key)
            .ok_or_else(|| UnknownPollutant(s.to_string()))
    }
}

/// Qualitative level of a single pollutant reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    Excellent,
    Good,
    Moderate,
    Poor,
    VeryPoor,
}

impl ScoreBand {
    /// Sub-score (0-100) carried by the band.
    pub fn score(self) -> u8 {
        match self {
            ScoreBand::Excellent => 100,
            ScoreBand::Good => 80,
            ScoreBand::Moderate => 60,
            ScoreBand::Poor => 40,
            ScoreBand::VeryPoor => 20,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScoreBand::Excellent => "excellent",
            ScoreBand::Good => "good",
            ScoreBand::Moderate => "moderate",
            ScoreBand::Poor => "poor",
            ScoreBand::VeryPoor => "very_poor",
        }
    }
}

impl fmt::Display for ScoreBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive upper bounds for lower-is-better pollutants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonotoneCutoffs {
    pub excellent: f64,
    pub good: f64,
    pub moderate: f64,
    pub poor: f64,
}

impl MonotoneCutoffs {
    pub fn band(&self, value: f64) -> ScoreBand {
        // Negative concentrations are physically impossible.
        if !value.is_finite() || value < 0.0 {
            return ScoreBand::VeryPoor;
        }
        if value <= self.excellent {
            ScoreBand::Excellent
        } else if value <= self.good {
            ScoreBand::Good
        } else if value <= self.moderate {
            ScoreBand::Moderate
        } else if value <= self.poor {
            ScoreBand::Poor
        } else {
            ScoreBand::VeryPoor
        }
    }
}

/// Nested inclusive ranges around a sweet spot.
///
/// When `poor` is `None`, anything outside `moderate` is rated poor rather
/// than very poor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComfortRanges {
    pub excellent: (f64, f64),
    pub good: (f64, f64),
    pub moderate: (f64, f64),
    #[serde(default)]
    pub poor: Option<(f64, f64)>,
}

impl ComfortRanges {
    pub fn band(&self, value: f64) -> ScoreBand {
        if !value.is_finite() {
            return ScoreBand::VeryPoor;
        }
        let within = |(low, high): (f64, f64)| low <= value && value <= high;
        if within(self.excellent) {
            ScoreBand::Excellent
        } else if within(self.good) {
            ScoreBand::Good
        } else if within(self.moderate) {
            ScoreBand::Moderate
        } else {
            match self.poor {
                Some(range) if within(range) => ScoreBand::Poor,
                Some(_) => ScoreBand::VeryPoor,
                None => ScoreBand::Poor,
            }
        }
    }
}

/// Band tables for every pollutant kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreTables {
    pub co2: MonotoneCutoffs,
    pub pm25: MonotoneCutoffs,
    pub tvoc: MonotoneCutoffs,
    pub humidity: ComfortRanges,
    pub temperature: ComfortRanges,
}

impl ScoreTables {
    pub const STANDARD: ScoreTables = ScoreTables {
        // ppm
        co2: MonotoneCutoffs {
            excellent: 600.0,
            good: 1000.0,
            moderate: 1400.0,
            poor: 2000.0,
        },
        // µg/m³
        pm25: MonotoneCutoffs {
            excellent: 12.0,
            good: 25.0,
            moderate: 50.0,
            poor: 100.0,
        },
        // ppb
        tvoc: MonotoneCutoffs {
            excellent: 200.0,
            good: 300.0,
            moderate: 500.0,
            poor: 1000.0,
        },
        // %RH
        humidity: ComfortRanges {
            excellent: (40.0, 50.0),
            good: (30.0, 60.0),
            moderate: (20.0, 70.0),
            poor: Some((10.0, 80.0)),
        },
        // °C
        temperature: ComfortRanges {
            excellent: (19.0, 22.0),
            good: (18.0, 24.0),
            moderate: (16.0, 26.0),
            poor: None,
        },
    };

    pub fn level(&self, kind: PollutantKind, value: f64) -> ScoreBand {
        match kind {
            PollutantKind::Co2 => self.co2.band(value),
            PollutantKind::Pm25 => self.pm25.band(value),
            PollutantKind::Tvoc => self.tvoc.band(value),
            PollutantKind::Humidity => self.humidity.band(value),
            PollutantKind::Temperature => self.temperature.band(value),
        }
    }

    pub fn score(&self, kind: PollutantKind, value: f64) -> u8 {
        self.level(kind, value).score()
    }
}

impl Default for ScoreTables {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// Sub-score of `value` using the standard tables.
pub fn score(kind: PollutantKind, value: f64) -> u8 {
    ScoreTables::STANDARD.score(kind, value)
}

/// Qualitative level of `value` using the standard tables.
pub fn level(kind: PollutantKind, value: f64) -> ScoreBand {
    ScoreTables::STANDARD.level(kind, value)
}

/// Rounds to a fixed number of decimals for reporting.
pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
