//! Room actuators and the capability profiles the selector works from.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub mod registry;
pub mod rules;
pub mod selector;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleType {
    Window,
    Ventilation,
    Purifier,
    Ac,
}

impl ModuleType {
    pub const ALL: [ModuleType; 4] = [
        ModuleType::Window,
        ModuleType::Ventilation,
        ModuleType::Purifier,
        ModuleType::Ac,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ModuleType::Window => "window",
            ModuleType::Ventilation => "ventilation",
            ModuleType::Purifier => "purifier",
            ModuleType::Ac => "ac",
        }
    }
}

impl fmt::Display for ModuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown module type: {0}")]
pub struct UnknownModuleType(pub String);

impl FromStr for ModuleType {
    type Err = UnknownModuleType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        ModuleType::ALL
            .into_iter()
            .find(|module| module.as_str() == key)
            .ok_or_else(|| UnknownModuleType(s.to_string()))
    }
}

/// What a single actuator in a room can do right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActuatorCapability {
    pub module_type: ModuleType,
    pub is_available: bool,
    pub is_controllable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_levels: Option<Vec<u32>>,
}

impl ActuatorCapability {
    pub fn new(module_type: ModuleType, is_available: bool, is_controllable: bool) -> Self {
        Self {
            module_type,
            is_available,
            is_controllable,
            current_state: None,
            power_levels: None,
        }
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.current_state = Some(state.into());
        self
    }

    pub fn with_power_levels(mut self, levels: Vec<u32>) -> Self {
        self.power_levels = Some(levels);
        self
    }

    /// Usable means present and remotely controllable.
    pub fn is_usable(&self) -> bool {
        self.is_available && self.is_controllable
    }

    /// Highest declared power level, if any.
    pub fn max_power_level(&self) -> Option<u32> {
        self.power_levels.as_deref()?.iter().copied().max()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileError {
    #[error("module {module} declared twice in {site_id}/{room_id}")]
    DuplicateModule {
        site_id: String,
        room_id: String,
        module: ModuleType,
    },
    #[error("room {site_id}/{room_id} declared twice")]
    DuplicateRoom { site_id: String, room_id: String },
}

/// Actuators installed in one room, at most one per module type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomActuatorProfile {
    pub site_id: String,
    pub room_id: String,
    modules: BTreeMap<ModuleType, ActuatorCapability>,
}

impl RoomActuatorProfile {
    /// A room with no known actuators.
    pub fn empty(site_id: impl Into<String>, room_id: impl Into<String>) -> Self {
        Self {
            site_id: site_id.into(),
            room_id: room_id.into(),
            modules: BTreeMap::new(),
        }
    }

    pub fn from_capabilities(
        site_id: impl Into<String>,
        room_id: impl Into<String>,
        capabilities: impl IntoIterator<Item = ActuatorCapability>,
    ) -> Result<Self, ProfileError> {
        let mut profile = Self::empty(site_id, room_id);
        for capability in capabilities {
            profile.insert(capability)?;
        }
        Ok(profile)
    }

    pub fn insert(&mut self, capability: ActuatorCapability) -> Result<(), ProfileError> {
        let module = capability.module_type;
        if self.modules.contains_key(&module) {
            return Err(ProfileError::DuplicateModule {
                site_id: self.site_id.clone(),
                room_id: self.room_id.clone(),
                module,
            });
        }
        self.modules.insert(module, capability);
        Ok(())
    }

    pub fn module(&self, module: ModuleType) -> Option<&ActuatorCapability> {
        self.modules.get(&module)
    }

    /// The module's capability, only when it is usable.
    pub fn usable(&self, module: ModuleType) -> Option<&ActuatorCapability> {
        self.module(module).filter(|capability| capability.is_usable())
    }

    /// Records the module's new state; false when the room lacks the module.
    pub fn set_state(&mut self, module: ModuleType, state: impl Into<String>) -> bool {
        match self.modules.get_mut(&module) {
            Some(capability) => {
                capability.current_state = Some(state.into());
                true
            }
            None => false,
        }
    }

    pub fn modules(&self) -> impl Iterator<Item = &ActuatorCapability> {
        self.modules.values()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}
