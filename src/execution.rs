//! Simulated execution of corrective actions.
//!
//! No physical module is driven. An execution is checked against the room's
//! configured actuators, the module's `current_state` is updated, and the
//! request is kept in a bounded log for later queries.

use crate::actuator::registry::ActuatorRegistry;
use crate::actuator::rules::ActionType;
use crate::actuator::selector::{ActionReason, CorrectiveAction};
use crate::actuator::ModuleType;
use crate::history::{Bounded, HistoryFilter};
use crate::priority::Priority;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::SystemTime;
use thiserror::Error;
use tracing::info;

/// An action a client asks the service to carry out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionExecution {
    pub site_id: String,
    pub room_id: String,
    pub module_type: ModuleType,
    pub action_type: ActionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<ActionReason>,
    #[serde(default = "default_priority")]
    pub priority: Priority,
    #[serde(default)]
    pub parameters: BTreeMap<String, Value>,
}

fn default_priority() -> Priority {
    Priority::Medium
}

impl From<CorrectiveAction> for ActionExecution {
    fn from(action: CorrectiveAction) -> Self {
        Self {
            site_id: action.site_id,
            room_id: action.room_id,
            module_type: action.module_type,
            action_type: action.action_type,
            reason: Some(action.reason),
            priority: action.priority,
            parameters: action.parameters,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Simulated,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionRecord {
    pub timestamp: SystemTime,
    pub action: ActionExecution,
    pub status: ExecutionStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    #[error("module {module} not found in room {site_id}/{room_id}")]
    ModuleNotFound {
        site_id: String,
        room_id: String,
        module: ModuleType,
    },
    #[error("module {module} in room {site_id}/{room_id} is not controllable")]
    NotControllable {
        site_id: String,
        room_id: String,
        module: ModuleType,
    },
    #[error("module {module} in room {site_id}/{room_id} is unavailable")]
    Unavailable {
        site_id: String,
        room_id: String,
        module: ModuleType,
    },
}

/// Validates `action` against the registry and applies its state change.
pub fn execute(
    registry: &mut ActuatorRegistry,
    action: ActionExecution,
    timestamp: SystemTime,
) -> Result<ExecutionRecord, ExecutionError> {
    let module = action.module_type;
    let site_id = action.site_id.clone();
    let room_id = action.room_id.clone();

    let Some(profile) = registry.get_mut(&action.site_id, &action.room_id) else {
        return Err(ExecutionError::ModuleNotFound {
            site_id,
            room_id,
            module,
        });
    };
    let Some(capability) = profile.module(module) else {
        return Err(ExecutionError::ModuleNotFound {
            site_id,
            room_id,
            module,
        });
    };
    if !capability.is_controllable {
        return Err(ExecutionError::NotControllable {
            site_id,
            room_id,
            module,
        });
    }
    if !capability.is_available {
        return Err(ExecutionError::Unavailable {
            site_id,
            room_id,
            module,
        });
    }

    profile.set_state(module, action.action_type.as_str());
    info!(
        site_id = %action.site_id,
        room_id = %action.room_id,
        module = %module,
        action = %action.action_type,
        priority = %action.priority,
        pollutant = action.reason.as_ref().map(|reason| reason.pollutant.as_str()),
        "Action executed (simulated)"
    );

    Ok(ExecutionRecord {
        timestamp,
        action,
        status: ExecutionStatus::Simulated,
    })
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionStats {
    pub total_actions: usize,
    pub by_room: BTreeMap<String, usize>,
    pub by_module: BTreeMap<String, usize>,
    pub by_action_type: BTreeMap<String, usize>,
    pub by_priority: BTreeMap<String, usize>,
    pub most_recent: Option<SystemTime>,
}

/// Latest executed actions, oldest evicted first.
#[derive(Debug, Clone)]
pub struct ExecutionLog {
    records: Bounded<ExecutionRecord>,
}

impl ExecutionLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: Bounded::new(capacity),
        }
    }

    pub fn record(&mut self, record: ExecutionRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.len() == 0
    }

    /// Matching executions, newest first.
    pub fn query(&self, filter: &HistoryFilter, limit: usize) -> Vec<ExecutionRecord> {
        self.records
            .oldest_first()
            .rev()
            .filter(|record| filter.matches_room(&record.action.site_id, &record.action.room_id))
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn stats(&self) -> ExecutionStats {
        let mut stats = ExecutionStats {
            total_actions: self.records.len(),
            most_recent: self.records.newest().map(|record| record.timestamp),
            ..ExecutionStats::default()
        };
        for record in self.records.oldest_first() {
            let action = &record.action;
            *stats.by_room.entry(action.room_id.clone()).or_default() += 1;
            *stats
                .by_module
                .entry(action.module_type.to_string())
                .or_default() += 1;
            *stats
                .by_action_type
                .entry(action.action_type.to_string())
                .or_default() += 1;
            *stats
                .by_priority
                .entry(action.priority.to_string())
                .or_default() += 1;
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::{ActuatorCapability, RoomActuatorProfile};
    use std::time::{Duration, UNIX_EPOCH};

    fn registry() -> ActuatorRegistry {
        let mut registry = ActuatorRegistry::new();
        registry.insert(
            RoomActuatorProfile::from_capabilities(
                "home",
                "office",
                [
                    ActuatorCapability::new(ModuleType::Window, true, true).with_state("closed"),
                    ActuatorCapability::new(ModuleType::Ac, true, false),
                    ActuatorCapability::new(ModuleType::Purifier, false, true),
                ],
            )
            .expect("unique modules"),
        );
        registry
    }

    fn request(room: &str, module: ModuleType, action: ActionType) -> ActionExecution {
        ActionExecution {
            site_id: "Home".to_string(),
            room_id: room.to_string(),
            module_type: module,
            action_type: action,
            reason: None,
            priority: Priority::High,
            parameters: BTreeMap::new(),
        }
    }

    #[test]
    fn execution_updates_module_state() -> Result<(), ExecutionError> {
        let mut registry = registry();

        let record = execute(
            &mut registry,
            request("OFFICE", ModuleType::Window, ActionType::OpenWindow),
            UNIX_EPOCH,
        )?;

        assert_eq!(record.status, ExecutionStatus::Simulated);
        let window = registry
            .get("home", "office")
            .and_then(|profile| profile.module(ModuleType::Window))
            .and_then(|module| module.current_state.clone());
        assert_eq!(window.as_deref(), Some("open_window"));
        Ok(())
    }

    #[test]
    fn unknown_room_or_module_is_not_found() {
        let mut registry = registry();

        let missing_room = execute(
            &mut registry,
            request("garage", ModuleType::Window, ActionType::OpenWindow),
            UNIX_EPOCH,
        );
        assert!(matches!(missing_room, Err(ExecutionError::ModuleNotFound { .. })));

        let missing_module = execute(
            &mut registry,
            request("office", ModuleType::Ventilation, ActionType::ActivateVentilation),
            UNIX_EPOCH,
        );
        assert!(matches!(
            missing_module,
            Err(ExecutionError::ModuleNotFound {
                module: ModuleType::Ventilation,
                ..
            })
        ));
    }

    #[test]
    fn uncontrollable_and_unavailable_modules_are_rejected() {
        let mut registry = registry();

        let ac = execute(
            &mut registry,
            request("office", ModuleType::Ac, ActionType::ActivateAc),
            UNIX_EPOCH,
        );
        assert!(matches!(ac, Err(ExecutionError::NotControllable { .. })));

        let purifier = execute(
            &mut registry,
            request("office", ModuleType::Purifier, ActionType::ActivatePurifier),
            UNIX_EPOCH,
        );
        assert!(matches!(purifier, Err(ExecutionError::Unavailable { .. })));

        let ac_state = registry
            .get("home", "office")
            .and_then(|profile| profile.module(ModuleType::Ac))
            .and_then(|module| module.current_state.clone());
        assert_eq!(ac_state, None);
    }

    #[test]
    fn corrective_action_converts_into_execution() {
        let action = CorrectiveAction {
            action_type: ActionType::ActivateVentilation,
            module_type: ModuleType::Ventilation,
            site_id: "home".to_string(),
            room_id: "office".to_string(),
            reason: ActionReason {
                pollutant: crate::scoring::PollutantKind::Humidity,
                value: 85.0,
                level: crate::scoring::ScoreBand::VeryPoor,
            },
            priority: Priority::Urgent,
            parameters: BTreeMap::from([("power_level".to_string(), Value::from(3))]),
        };

        let execution = ActionExecution::from(action);

        assert_eq!(execution.priority, Priority::Urgent);
        assert_eq!(execution.parameters["power_level"], 3);
        assert!(execution.reason.is_some());
    }

    #[test]
    fn execution_request_defaults_optional_fields() -> Result<(), serde_json::Error> {
        let execution: ActionExecution = serde_json::from_value(serde_json::json!({
            "site_id": "home",
            "room_id": "office",
            "module_type": "window",
            "action_type": "close_window"
        }))?;

        assert_eq!(execution.priority, Priority::Medium);
        assert!(execution.reason.is_none());
        assert!(execution.parameters.is_empty());
        Ok(())
    }

    #[test]
    fn log_is_bounded_filtered_and_counted() {
        let mut log = ExecutionLog::new(2);
        for (secs, room, action) in [
            (1, "office", ActionType::OpenWindow),
            (2, "kitchen", ActionType::OpenWindow),
            (3, "office", ActionType::CloseWindow),
        ] {
            log.record(ExecutionRecord {
                timestamp: UNIX_EPOCH + Duration::from_secs(secs),
                action: request(room, ModuleType::Window, action),
                status: ExecutionStatus::Simulated,
            });
        }

        assert_eq!(log.len(), 2);
        let office = HistoryFilter {
            site_id: None,
            room_id: Some("Office".to_string()),
        };
        let records = log.query(&office, 10);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].action.action_type, ActionType::CloseWindow);

        let stats = log.stats();
        assert_eq!(stats.total_actions, 2);
        assert_eq!(stats.by_room["kitchen"], 1);
        assert_eq!(stats.by_action_type["close_window"], 1);
        assert_eq!(stats.by_priority["high"], 2);
        assert_eq!(stats.most_recent, Some(UNIX_EPOCH + Duration::from_secs(3)));
    }
}
