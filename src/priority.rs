use crate::scoring::ScoreBand;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Urgency attached to a recommended action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    /// Priority for an action triggered by a pollutant at `level`.
    pub fn for_level(level: ScoreBand) -> Self {
        match level {
            ScoreBand::VeryPoor => Priority::Urgent,
            ScoreBand::Poor => Priority::High,
            ScoreBand::Moderate => Priority::Medium,
            ScoreBand::Good => Priority::Low,
            // Not an escalation level; medium is the fallback.
            ScoreBand::Excellent => Priority::Medium,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
