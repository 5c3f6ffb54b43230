use crate::actuator::{ActuatorCapability, ProfileError, RoomActuatorProfile};
use crate::config::SiteSection;
use std::collections::BTreeMap;

/// Room profiles for every configured site, looked up by (site, room).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActuatorRegistry {
    rooms: BTreeMap<(String, String), RoomActuatorProfile>,
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

impl ActuatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_sites(sites: &[SiteSection]) -> Result<Self, ProfileError> {
        let mut registry = Self::new();
        for site in sites {
            for room in &site.rooms {
                let capabilities = room.modules.iter().map(|(module_type, module)| {
                    let mut capability =
                        ActuatorCapability::new(*module_type, module.available, module.controllable);
                    capability.current_state = module.current_state.clone();
                    capability.power_levels = module.power_levels.clone();
                    capability
                });
                if registry.get(&site.id, &room.id).is_some() {
                    return Err(ProfileError::DuplicateRoom {
                        site_id: site.id.clone(),
                        room_id: room.id.clone(),
                    });
                }
                let profile =
                    RoomActuatorProfile::from_capabilities(&site.id, &room.id, capabilities)?;
                registry.insert(profile);
            }
        }
        Ok(registry)
    }

    /// Adds or replaces the profile for its (site, room).
    pub fn insert(&mut self, profile: RoomActuatorProfile) -> Option<RoomActuatorProfile> {
        let key = (normalize(&profile.site_id), normalize(&profile.room_id));
        self.rooms.insert(key, profile)
    }

    pub fn get(&self, site_id: &str, room_id: &str) -> Option<&RoomActuatorProfile> {
        self.rooms.get(&(normalize(site_id), normalize(room_id)))
    }

    pub fn get_mut(&mut self, site_id: &str, room_id: &str) -> Option<&mut RoomActuatorProfile> {
        self.rooms.get_mut(&(normalize(site_id), normalize(room_id)))
    }

    /// The configured profile, or an empty one for unknown rooms.
    pub fn profile_or_empty(&self, site_id: &str, room_id: &str) -> RoomActuatorProfile {
        self.get(site_id, room_id)
            .cloned()
            .unwrap_or_else(|| RoomActuatorProfile::empty(site_id, room_id))
    }

    pub fn site_count(&self) -> usize {
        let mut sites: Vec<&str> = self.rooms.keys().map(|(site, _)| site.as_str()).collect();
        sites.dedup();
        sites.len()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::ModuleType;
    use crate::config::{ModuleSection, RoomSection};

    fn sites() -> Vec<SiteSection> {
        vec![SiteSection {
            id: "Home".to_string(),
            rooms: vec![
                RoomSection {
                    id: "Office".to_string(),
                    modules: BTreeMap::from([
                        (
                            ModuleType::Window,
                            ModuleSection {
                                available: true,
                                controllable: true,
                                current_state: Some("closed".to_string()),
                                power_levels: None,
                            },
                        ),
                        (
                            ModuleType::Ventilation,
                            ModuleSection {
                                available: true,
                                controllable: true,
                                current_state: None,
                                power_levels: Some(vec![0, 1, 2, 3]),
                            },
                        ),
                    ]),
                },
                RoomSection {
                    id: "Bedroom".to_string(),
                    modules: BTreeMap::new(),
                },
            ],
        }]
    }

    #[test]
    fn lookup_ignores_case_and_whitespace() -> Result<(), ProfileError> {
        let registry = ActuatorRegistry::from_sites(&sites())?;

        let profile = registry.get("  home ", "OFFICE").expect("office profile");
        assert_eq!(profile.site_id, "Home");
        assert!(profile.usable(ModuleType::Window).is_some());
        assert_eq!(
            profile
                .usable(ModuleType::Ventilation)
                .and_then(|module| module.max_power_level()),
            Some(3)
        );
        assert_eq!(registry.site_count(), 1);
        assert_eq!(registry.room_count(), 2);
        Ok(())
    }

    #[test]
    fn rooms_normalizing_to_the_same_key_are_rejected() {
        let mut sites = sites();
        sites.push(SiteSection {
            id: " HOME".to_string(),
            rooms: vec![RoomSection {
                id: "office ".to_string(),
                modules: BTreeMap::new(),
            }],
        });

        let result = ActuatorRegistry::from_sites(&sites);

        assert_eq!(
            result,
            Err(ProfileError::DuplicateRoom {
                site_id: " HOME".to_string(),
                room_id: "office ".to_string(),
            })
        );
    }

    #[test]
    fn unknown_room_resolves_to_empty_profile() -> Result<(), ProfileError> {
        let registry = ActuatorRegistry::from_sites(&sites())?;

        assert!(registry.get("home", "garage").is_none());
        let profile = registry.profile_or_empty("home", "garage");
        assert!(profile.is_empty());
        assert_eq!(profile.room_id, "garage");
        Ok(())
    }
}
