//! Decision engine facade.
//!
//! Bundles the scoring tables, weights, risk thresholds and action rules so
//! callers evaluate a room with one value. Every method is a pure function
//! of its arguments; an `Engine` can be shared across threads freely.

use crate::actuator::RoomActuatorProfile;
use crate::actuator::rules::ActionRules;
use crate::actuator::selector::{self, CorrectiveAction};
use crate::scoring::composite::{self, CompositeScoreResult, ProblematicPollutant, Weights};
use crate::scoring::trend::{RiskAnalysis, TrendAnalyzer};
use crate::scoring::{PollutantKind, ScoreTables};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Engine {
    pub tables: ScoreTables,
    pub weights: Weights,
    pub trend: TrendAnalyzer,
    pub rules: ActionRules,
}

/// Score and corrective actions for one room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomEvaluation {
    pub site_id: String,
    pub room_id: String,
    pub score: CompositeScoreResult,
    pub actions: Vec<CorrectiveAction>,
}

impl Engine {
    pub fn aggregate<I, K>(&self, readings: I) -> CompositeScoreResult
    where
        I: IntoIterator<Item = (K, f64)>,
        K: AsRef<str>,
    {
        composite::aggregate(&self.tables, &self.weights, readings)
    }

    pub fn analyze(
        &self,
        current: &BTreeMap<PollutantKind, f64>,
        predicted: &BTreeMap<PollutantKind, f64>,
    ) -> RiskAnalysis {
        self.trend.analyze(current, predicted)
    }

    pub fn select(
        &self,
        problematic: &[ProblematicPollutant],
        profile: &RoomActuatorProfile,
    ) -> Vec<CorrectiveAction> {
        selector::select(&self.rules, problematic, profile)
    }

    /// Scores `readings` and picks actions from the room's actuators.
    pub fn evaluate<I, K>(&self, readings: I, profile: &RoomActuatorProfile) -> RoomEvaluation
    where
        I: IntoIterator<Item = (K, f64)>,
        K: AsRef<str>,
    {
        let score = self.aggregate(readings);
        let actions = self.select(&score.problematic, profile);
        RoomEvaluation {
            site_id: profile.site_id.clone(),
            room_id: profile.room_id.clone(),
            score,
            actions,
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self {
            tables: ScoreTables::STANDARD,
            weights: Weights::STANDARD,
            trend: TrendAnalyzer::default(),
            rules: ActionRules::standard(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::rules::ActionType;
    use crate::actuator::{ActuatorCapability, ModuleType};

    #[test]
    fn evaluate_chains_scoring_and_selection() {
        let engine = Engine::default();
        let room = RoomActuatorProfile::from_capabilities(
            "home",
            "bedroom",
            [
                ActuatorCapability::new(ModuleType::Window, true, true),
                ActuatorCapability::new(ModuleType::Ventilation, false, false),
            ],
        )
        .expect("unique modules");

        let evaluation = engine.evaluate(
            [("co2", 1450.0), ("pm25", 15.0), ("tvoc", 650.0), ("humidity", 45.0)],
            &room,
        );

        assert_eq!(evaluation.room_id, "bedroom");
        assert_eq!(evaluation.score.problematic.len(), 2);
        let kinds: Vec<_> = evaluation
            .actions
            .iter()
            .map(|action| (action.reason.pollutant, action.action_type))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (PollutantKind::Co2, ActionType::OpenWindow),
                (PollutantKind::Tvoc, ActionType::OpenWindow),
            ]
        );
    }

    #[test]
    fn clean_air_yields_no_actions() {
        let engine = Engine::default();
        let room = RoomActuatorProfile::empty("home", "bedroom");

        let evaluation = engine.evaluate(
            [("co2", 450.0), ("pm25", 4.0), ("tvoc", 80.0), ("humidity", 45.0)],
            &room,
        );

        assert_eq!(evaluation.score.global_score, 100.0);
        assert!(evaluation.actions.is_empty());
    }

    #[test]
    fn engine_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Engine>();
    }
}
