//! Declarative pollutant → actuator rules.

use crate::actuator::ModuleType;
use crate::scoring::PollutantKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    OpenWindow,
    CloseWindow,
    ActivateVentilation,
    DeactivateVentilation,
    BoostVentilation,
    ReduceVentilation,
    ActivateAc,
    DeactivateAc,
    ActivatePurifier,
    DeactivatePurifier,
    AdjustTemperature,
}

impl ActionType {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionType::OpenWindow => "open_window",
            ActionType::CloseWindow => "close_window",
            ActionType::ActivateVentilation => "activate_ventilation",
            ActionType::DeactivateVentilation => "deactivate_ventilation",
            ActionType::BoostVentilation => "boost_ventilation",
            ActionType::ReduceVentilation => "reduce_ventilation",
            ActionType::ActivateAc => "activate_ac",
            ActionType::DeactivateAc => "deactivate_ac",
            ActionType::ActivatePurifier => "activate_purifier",
            ActionType::DeactivatePurifier => "deactivate_purifier",
            ActionType::AdjustTemperature => "adjust_temperature",
        }
    }

    /// Ventilation actions that take a fan power level.
    pub fn takes_power_level(self) -> bool {
        matches!(
            self,
            ActionType::ActivateVentilation | ActionType::BoostVentilation
        )
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which modules can correct one pollutant, in preference order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRule {
    pub primary: Vec<ModuleType>,
    #[serde(default)]
    pub secondary: Vec<ModuleType>,
    pub actions: BTreeMap<ModuleType, Vec<ActionType>>,
}

impl ActionRule {
    pub fn new(primary: Vec<ModuleType>) -> Self {
        Self {
            primary,
            secondary: Vec::new(),
            actions: BTreeMap::new(),
        }
    }

    pub fn with_secondary(mut self, secondary: Vec<ModuleType>) -> Self {
        self.secondary = secondary;
        self
    }

    pub fn with_actions(mut self, module: ModuleType, actions: Vec<ActionType>) -> Self {
        self.actions.insert(module, actions);
        self
    }

    /// Candidate actions for `module`, most preferred first.
    pub fn candidates(&self, module: ModuleType) -> &[ActionType] {
        self.actions.get(&module).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Rule table keyed by pollutant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionRules {
    rules: BTreeMap<PollutantKind, ActionRule>,
}

impl ActionRules {
    pub fn standard() -> Self {
        use ActionType::*;
        use ModuleType::*;

        let rules = BTreeMap::from([
            (
                PollutantKind::Co2,
                ActionRule::new(vec![Window, Ventilation])
                    .with_actions(Window, vec![OpenWindow])
                    .with_actions(Ventilation, vec![ActivateVentilation, BoostVentilation]),
            ),
            (
                PollutantKind::Pm25,
                ActionRule::new(vec![Purifier])
                    .with_secondary(vec![Ventilation])
                    .with_actions(Purifier, vec![ActivatePurifier])
                    .with_actions(Ventilation, vec![ActivateVentilation]),
            ),
            (
                PollutantKind::Tvoc,
                ActionRule::new(vec![Window, Ventilation, Purifier])
                    .with_actions(Window, vec![OpenWindow])
                    .with_actions(Ventilation, vec![ActivateVentilation, BoostVentilation])
                    .with_actions(Purifier, vec![ActivatePurifier]),
            ),
            (
                PollutantKind::Humidity,
                ActionRule::new(vec![Ventilation, Ac])
                    .with_actions(Ventilation, vec![ActivateVentilation])
                    .with_actions(Ac, vec![ActivateAc]),
            ),
        ]);
        Self { rules }
    }

    pub fn empty() -> Self {
        Self {
            rules: BTreeMap::new(),
        }
    }

    pub fn rule(&self, kind: PollutantKind) -> Option<&ActionRule> {
        self.rules.get(&kind)
    }

    /// Replaces the rule for `kind`, returning the previous one.
    pub fn set(&mut self, kind: PollutantKind, rule: ActionRule) -> Option<ActionRule> {
        self.rules.insert(kind, rule)
    }

    /// Applies per-pollutant overrides on top of this table.
    pub fn merged(mut self, overrides: ActionRules) -> Self {
        self.rules.extend(overrides.rules);
        self
    }
}

impl Default for ActionRules {
    fn default() -> Self {
        Self::standard()
    }
}
