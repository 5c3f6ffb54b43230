//! Capability-constrained selection of corrective actions.

use crate::actuator::rules::{ActionRule, ActionRules, ActionType};
use crate::actuator::{ActuatorCapability, ModuleType, RoomActuatorProfile};
use crate::priority::Priority;
use crate::scoring::composite::ProblematicPollutant;
use crate::scoring::{PollutantKind, ScoreBand, round_to};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{info, warn};

pub const DEFAULT_TARGET_TEMPERATURE: u32 = 22;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActionReason {
    pub pollutant: PollutantKind,
    pub value: f64,
    pub level: ScoreBand,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectiveAction {
    pub action_type: ActionType,
    pub module_type: ModuleType,
    pub site_id: String,
    pub room_id: String,
    pub reason: ActionReason,
    pub priority: Priority,
    pub parameters: BTreeMap<String, Value>,
}

/// Picks at most one action per problematic pollutant.
///
/// Each pollutant scans its rule independently, so two pollutants may both
/// target the same module.
pub fn select(
    rules: &ActionRules,
    problematic: &[ProblematicPollutant],
    profile: &RoomActuatorProfile,
) -> Vec<CorrectiveAction> {
    let mut actions = Vec::new();

    if problematic.is_empty() {
        info!(
            site_id = %profile.site_id,
            room_id = %profile.room_id,
            "Air quality acceptable, no action needed"
        );
        return actions;
    }

    info!(
        site_id = %profile.site_id,
        room_id = %profile.room_id,
        count = problematic.len(),
        "Problematic pollutants detected"
    );

    for problem in problematic {
        let Some(rule) = rules.rule(problem.pollutant) else {
            warn!(pollutant = %problem.pollutant, "No action rule defined for pollutant");
            continue;
        };

        let chosen = first_usable(&rule.primary, rule, profile)
            .map(|choice| (choice, "primary"))
            .or_else(|| first_usable(&rule.secondary, rule, profile).map(|c| (c, "secondary")));

        match chosen {
            Some(((capability, action_type), path)) => {
                let action = build_action(action_type, capability, problem, profile);
                info!(
                    pollutant = %problem.pollutant,
                    module = %action.module_type,
                    action = %action.action_type,
                    priority = %action.priority,
                    path,
                    "Action selected"
                );
                actions.push(action);
            }
            None => {
                warn!(
                    pollutant = %problem.pollutant,
                    site_id = %profile.site_id,
                    room_id = %profile.room_id,
                    "No actuator available for this pollutant"
                );
            }
        }
    }

    actions
}

fn first_usable<'a>(
    modules: &[ModuleType],
    rule: &ActionRule,
    profile: &'a RoomActuatorProfile,
) -> Option<(&'a ActuatorCapability, ActionType)> {
    modules.iter().find_map(|&module| {
        let capability = profile.usable(module)?;
        let action_type = rule.candidates(module).first().copied()?;
        Some((capability, action_type))
    })
}

/// Builds one action against `capability` for the given problem.
pub fn build_action(
    action_type: ActionType,
    capability: &ActuatorCapability,
    problem: &ProblematicPollutant,
    profile: &RoomActuatorProfile,
) -> CorrectiveAction {
    let mut parameters = BTreeMap::new();

    if action_type.takes_power_level() {
        if let Some(level) = power_level(capability, problem.level) {
            parameters.insert("power_level".to_string(), Value::from(level));
        }
    } else if action_type == ActionType::AdjustTemperature {
        parameters.insert(
            "target_temperature".to_string(),
            Value::from(DEFAULT_TARGET_TEMPERATURE),
        );
    }

    CorrectiveAction {
        action_type,
        module_type: capability.module_type,
        site_id: profile.site_id.clone(),
        room_id: profile.room_id.clone(),
        reason: ActionReason {
            pollutant: problem.pollutant,
            value: round_to(problem.value, 2),
            level: problem.level,
        },
        priority: Priority::for_level(problem.level),
        parameters,
    }
}

/// Fan power for a severity, scaled to the module's declared levels.
pub fn power_level(capability: &ActuatorCapability, level: ScoreBand) -> Option<u32> {
    let max = capability.max_power_level()?;
    let power = match level {
        ScoreBand::VeryPoor => max,
        ScoreBand::Poor => max.saturating_sub(1),
        ScoreBand::Moderate | ScoreBand::Good | ScoreBand::Excellent => max / 2,
    };
    Some(power)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn problem(pollutant: PollutantKind, value: f64, level: ScoreBand) -> ProblematicPollutant {
        ProblematicPollutant {
            pollutant,
            value,
            score: level.score(),
            level,
        }
    }

    fn profile(capabilities: Vec<ActuatorCapability>) -> RoomActuatorProfile {
        RoomActuatorProfile::from_capabilities("home", "bedroom", capabilities)
            .expect("unique modules")
    }

    fn ventilation() -> ActuatorCapability {
        ActuatorCapability::new(ModuleType::Ventilation, true, true)
            .with_state("idle")
            .with_power_levels(vec![0, 1, 2, 3])
    }

    #[test]
    fn window_serves_both_co2_and_tvoc_without_dedup() {
        let room = profile(vec![
            ActuatorCapability::new(ModuleType::Window, true, true).with_state("closed"),
            ActuatorCapability::new(ModuleType::Ventilation, false, false),
        ]);
        let problems = [
            problem(PollutantKind::Co2, 1450.0, ScoreBand::Poor),
            problem(PollutantKind::Tvoc, 650.0, ScoreBand::Poor),
        ];

        let actions = select(&ActionRules::standard(), &problems, &room);

        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0].action_type, ActionType::OpenWindow);
        assert_eq!(actions[0].module_type, ModuleType::Window);
        assert_eq!(actions[0].reason.pollutant, PollutantKind::Co2);
        assert_eq!(actions[0].priority, Priority::High);
        assert_eq!(actions[1].module_type, ModuleType::Window);
        assert_eq!(actions[1].reason.pollutant, PollutantKind::Tvoc);
        assert!(actions[0].parameters.is_empty());
    }

    #[test]
    fn primary_order_is_respected() {
        let room = profile(vec![
            ventilation(),
            ActuatorCapability::new(ModuleType::Window, true, true),
        ]);
        let problems = [problem(PollutantKind::Co2, 2500.0, ScoreBand::VeryPoor)];

        let actions = select(&ActionRules::standard(), &problems, &room);

        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].module_type, ModuleType::Window);
        assert_eq!(actions[0].priority, Priority::Urgent);
    }

    #[test]
    fn ventilation_takes_first_candidate_with_power_level() {
        let room = profile(vec![
            ActuatorCapability::new(ModuleType::Window, true, false),
            ventilation(),
        ]);
        let problems = [problem(PollutantKind::Co2, 2500.0, ScoreBand::VeryPoor)];

        let actions = select(&ActionRules::standard(), &problems, &room);

        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].action_type, ActionType::ActivateVentilation);
        assert_eq!(actions[0].parameters["power_level"], Value::from(3));
    }

    #[test]
    fn pm25_uses_secondary_when_no_purifier() {
        let room = profile(vec![
            ActuatorCapability::new(ModuleType::Purifier, false, false),
            ventilation(),
        ]);
        let problems = [problem(PollutantKind::Pm25, 70.0, ScoreBand::Poor)];

        let actions = select(&ActionRules::standard(), &problems, &room);

        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].module_type, ModuleType::Ventilation);
        assert_eq!(actions[0].parameters["power_level"], Value::from(2));
    }

    #[test]
    fn primary_wins_over_secondary() {
        let room = profile(vec![
            ActuatorCapability::new(ModuleType::Purifier, true, true),
            ventilation(),
        ]);
        let problems = [problem(PollutantKind::Pm25, 70.0, ScoreBand::Poor)];

        let actions = select(&ActionRules::standard(), &problems, &room);

        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].action_type, ActionType::ActivatePurifier);
    }

    #[test]
    fn unusable_room_yields_no_actions() {
        let room = RoomActuatorProfile::empty("home", "attic");
        let problems = [
            problem(PollutantKind::Co2, 2500.0, ScoreBand::VeryPoor),
            problem(PollutantKind::Pm25, 150.0, ScoreBand::VeryPoor),
        ];

        assert!(select(&ActionRules::standard(), &problems, &room).is_empty());
    }

    #[test]
    fn pollutant_without_rule_is_skipped_but_others_proceed() {
        let room = profile(vec![ActuatorCapability::new(ModuleType::Ac, true, true)]);
        let problems = [
            problem(PollutantKind::Temperature, 35.0, ScoreBand::Poor),
            problem(PollutantKind::Humidity, 85.0, ScoreBand::VeryPoor),
        ];

        let actions = select(&ActionRules::standard(), &problems, &room);

        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].action_type, ActionType::ActivateAc);
        assert_eq!(actions[0].reason.pollutant, PollutantKind::Humidity);
    }

    #[test]
    fn module_without_candidates_is_passed_over() {
        let mut rules = ActionRules::standard();
        rules.set(
            PollutantKind::Co2,
            ActionRule::new(vec![ModuleType::Window, ModuleType::Ventilation])
                .with_actions(ModuleType::Ventilation, vec![ActionType::BoostVentilation]),
        );
        let room = profile(vec![
            ActuatorCapability::new(ModuleType::Window, true, true),
            ventilation(),
        ]);
        let problems = [problem(PollutantKind::Co2, 1200.0, ScoreBand::Moderate)];

        let actions = select(&rules, &problems, &room);

        assert_eq!(actions[0].action_type, ActionType::BoostVentilation);
        assert_eq!(actions[0].parameters["power_level"], Value::from(1));
    }

    #[test]
    fn power_level_scales_with_severity() {
        let capability = ventilation();
        assert_eq!(power_level(&capability, ScoreBand::VeryPoor), Some(3));
        assert_eq!(power_level(&capability, ScoreBand::Poor), Some(2));
        assert_eq!(power_level(&capability, ScoreBand::Moderate), Some(1));
        assert_eq!(power_level(&capability, ScoreBand::Good), Some(1));

        let bare = ActuatorCapability::new(ModuleType::Ventilation, true, true);
        assert_eq!(power_level(&bare, ScoreBand::VeryPoor), None);

        let single = bare.with_power_levels(vec![0]);
        assert_eq!(power_level(&single, ScoreBand::Poor), Some(0));
    }

    #[test]
    fn adjust_temperature_defaults_target() {
        let room = profile(vec![ActuatorCapability::new(ModuleType::Ac, true, true)]);
        let capability = room.usable(ModuleType::Ac).expect("ac usable");
        let action = build_action(
            ActionType::AdjustTemperature,
            capability,
            &problem(PollutantKind::Temperature, 27.456, ScoreBand::Poor),
            &room,
        );

        assert_eq!(action.parameters["target_temperature"], Value::from(22));
        assert_eq!(action.reason.value, 27.46);
    }

    #[test]
    fn selection_does_not_touch_profile() {
        let room = profile(vec![ventilation()]);
        let before = room.clone();
        let problems = [problem(PollutantKind::Humidity, 90.0, ScoreBand::VeryPoor)];

        let _ = select(&ActionRules::standard(), &problems, &room);

        assert_eq!(room, before);
    }

    #[test]
    fn action_serializes_wire_shape() {
        let room = profile(vec![ActuatorCapability::new(ModuleType::Window, true, true)]);
        let actions = select(
            &ActionRules::standard(),
            &[problem(PollutantKind::Co2, 1450.0, ScoreBand::Poor)],
            &room,
        );

        let value = serde_json::to_value(&actions[0]).expect("serialize action");
        assert_eq!(
            value,
            serde_json::json!({
                "action_type": "open_window",
                "module_type": "window",
                "site_id": "home",
                "room_id": "bedroom",
                "reason": {"pollutant": "co2", "value": 1450.0, "level": "poor"},
                "priority": "high",
                "parameters": {}
            })
        );
    }
}
