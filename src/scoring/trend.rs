//! Forecast-aware risk analysis.
//!
//! Compares each current reading with its forecast, rates both against
//! warning/critical/danger thresholds, and decides whether the trend calls
//! for a recommendation and how urgent it is.

use crate::priority::Priority;
use crate::scoring::{PollutantKind, round_to};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Pollutants the trend analysis covers, in evaluation order.
pub const TRACKED: [PollutantKind; 3] = [PollutantKind::Co2, PollutantKind::Pm25, PollutantKind::Tvoc];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Good,
    Warning,
    Critical,
    Danger,
}

impl RiskLevel {
    pub fn is_critical_or_worse(self) -> bool {
        matches!(self, RiskLevel::Critical | RiskLevel::Danger)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Good => "good",
            RiskLevel::Warning => "warning",
            RiskLevel::Critical => "critical",
            RiskLevel::Danger => "danger",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Decreasing,
}

impl Trend {
    /// A flat forecast counts as decreasing.
    pub fn between(current: f64, predicted: f64) -> Self {
        if predicted > current {
            Trend::Increasing
        } else {
            Trend::Decreasing
        }
    }
}

/// Lower bounds (inclusive) of each risk level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskThresholds {
    pub warning: f64,
    pub critical: f64,
    pub danger: f64,
}

impl RiskThresholds {
    pub fn level(&self, value: f64) -> RiskLevel {
        if value >= self.danger {
            RiskLevel::Danger
        } else if value >= self.critical {
            RiskLevel::Critical
        } else if value >= self.warning {
            RiskLevel::Warning
        } else {
            RiskLevel::Good
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskTables {
    pub co2: RiskThresholds,
    pub pm25: RiskThresholds,
    pub tvoc: RiskThresholds,
}

impl RiskTables {
    pub const STANDARD: RiskTables = RiskTables {
        co2: RiskThresholds {
            warning: 1000.0,
            critical: 1400.0,
            danger: 2000.0,
        },
        pm25: RiskThresholds {
            warning: 25.0,
            critical: 50.0,
            danger: 100.0,
        },
        tvoc: RiskThresholds {
            warning: 300.0,
            critical: 500.0,
            danger: 1000.0,
        },
    };

    pub fn thresholds(&self, kind: PollutantKind) -> Option<&RiskThresholds> {
        match kind {
            PollutantKind::Co2 => Some(&self.co2),
            PollutantKind::Pm25 => Some(&self.pm25),
            PollutantKind::Tvoc => Some(&self.tvoc),
            PollutantKind::Humidity | PollutantKind::Temperature => None,
        }
    }
}

impl Default for RiskTables {
    fn default() -> Self {
        Self::STANDARD
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskMetric {
    pub pollutant: PollutantKind,
    pub current_value: f64,
    pub predicted_value: f64,
    pub current_level: RiskLevel,
    pub predicted_level: RiskLevel,
    pub trend: Trend,
    pub change_percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimeToCritical {
    /// Already critical and still rising.
    Now,
    /// Critical today, forecast lower but still critical.
    Improving,
    Within { minutes: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecommendation {
    pub metric: PollutantKind,
    pub level: RiskLevel,
    pub action: String,
    pub priority: Priority,
    pub estimated_time_to_critical: TimeToCritical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAnalysis {
    pub metrics: BTreeMap<PollutantKind, RiskMetric>,
    pub actions_needed: Vec<ActionRecommendation>,
    pub overall_status: RiskLevel,
}

/// Short occupant-facing advice for a pollutant at a risk level.
pub fn advice(kind: PollutantKind, level: RiskLevel) -> Option<&'static str> {
    let text = match (kind, level) {
        (_, RiskLevel::Good) => return None,
        (PollutantKind::Co2, RiskLevel::Warning) => "Increase ventilation",
        (PollutantKind::Co2, RiskLevel::Critical) => "Open the windows immediately",
        (PollutantKind::Co2, RiskLevel::Danger) => "Leave the room and air it out completely",
        (PollutantKind::Pm25, RiskLevel::Warning) => "Turn on the air purifier",
        (PollutantKind::Pm25, RiskLevel::Critical) => "Run the purifier at full power and ventilate",
        (PollutantKind::Pm25, RiskLevel::Danger) => "Avoid the room, intensive purification required",
        (PollutantKind::Tvoc, RiskLevel::Warning) => "Air the room for 15 minutes",
        (PollutantKind::Tvoc, RiskLevel::Critical) => "Ventilate intensively and locate the source",
        (PollutantKind::Tvoc, RiskLevel::Danger) => "Evacuate and ventilate the whole area",
        (PollutantKind::Humidity | PollutantKind::Temperature, _) => return None,
    };
    Some(text)
}

/// Risk analyzer bound to a set of thresholds and a forecast horizon.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendAnalyzer {
    pub thresholds: RiskTables,
    pub horizon_minutes: u32,
}

impl TrendAnalyzer {
    pub const DEFAULT_HORIZON_MINUTES: u32 = 30;

    pub fn new(thresholds: RiskTables, horizon_minutes: u32) -> Self {
        Self {
            thresholds,
            horizon_minutes,
        }
    }

    /// Rates every tracked pollutant present in both maps.
    pub fn analyze(
        &self,
        current: &BTreeMap<PollutantKind, f64>,
        predicted: &BTreeMap<PollutantKind, f64>,
    ) -> RiskAnalysis {
        let mut metrics = BTreeMap::new();
        let mut actions_needed = Vec::new();

        for kind in TRACKED {
            let (Some(&current_value), Some(&predicted_value)) =
                (current.get(&kind), predicted.get(&kind))
            else {
                continue;
            };
            let Some(thresholds) = self.thresholds.thresholds(kind) else {
                continue;
            };

            let metric = RiskMetric {
                pollutant: kind,
                current_value: round_to(current_value, 2),
                predicted_value: round_to(predicted_value, 2),
                current_level: thresholds.level(current_value),
                predicted_level: thresholds.level(predicted_value),
                trend: Trend::between(current_value, predicted_value),
                change_percent: change_percent(current_value, predicted_value),
            };

            if let Some(action) = self.escalate(&metric) {
                actions_needed.push(action);
            }
            metrics.insert(kind, metric);
        }

        let overall_status = metrics
            .values()
            .map(|metric| metric.predicted_level)
            .max()
            .unwrap_or(RiskLevel::Good);

        RiskAnalysis {
            metrics,
            actions_needed,
            overall_status,
        }
    }

    fn escalate(&self, metric: &RiskMetric) -> Option<ActionRecommendation> {
        let current_bad = metric.current_level.is_critical_or_worse();
        let predicted_bad = metric.predicted_level.is_critical_or_worse();

        let (level, priority, eta) = match metric.trend {
            Trend::Increasing if current_bad => {
                (metric.current_level, Priority::Urgent, TimeToCritical::Now)
            }
            Trend::Decreasing if current_bad => {
                if !predicted_bad {
                    return None;
                }
                (metric.current_level, Priority::High, TimeToCritical::Improving)
            }
            _ if predicted_bad => {
                let priority = if metric.predicted_level == RiskLevel::Danger {
                    Priority::High
                } else {
                    Priority::Medium
                };
                let eta = TimeToCritical::Within {
                    minutes: self.horizon_minutes,
                };
                (metric.predicted_level, priority, eta)
            }
            _ => return None,
        };

        Some(ActionRecommendation {
            metric: metric.pollutant,
            level,
            action: advice(metric.pollutant, level).unwrap_or_default().to_string(),
            priority,
            estimated_time_to_critical: eta,
        })
    }
}

impl Default for TrendAnalyzer {
    fn default() -> Self {
        Self::new(RiskTables::STANDARD, Self::DEFAULT_HORIZON_MINUTES)
    }
}

/// Relative change in percent; 0 when it cannot be computed.
fn change_percent(current: f64, predicted: f64) -> f64 {
    if current <= 0.0 || !current.is_finite() {
        return 0.0;
    }
    let change = (predicted - current) / current * 100.0;
    if change.is_finite() {
        round_to(change, 2)
    } else {
        0.0
    }
}
