use crate::actuator::ModuleType;
use crate::actuator::registry::ActuatorRegistry;
use crate::actuator::rules::ActionRules;
use crate::engine::Engine;
use crate::scoring::ScoreTables;
use crate::scoring::composite::Weights;
use crate::scoring::trend::{RiskTables, TrendAnalyzer};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";
pub const DEFAULT_SERVER_PORT: u16 = 8080;
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;
pub const DEFAULT_HORIZON_STEPS: u32 = 6;
pub const DEFAULT_STEP_MINUTES: u32 = 5;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub app: AppSection,
    pub logging: LoggingSection,
    #[serde(default)]
    pub server: Option<ServerSection>,
    #[serde(default)]
    pub forecast: Option<ForecastSection>,
    #[serde(default)]
    pub engine: EngineSection,
    #[serde(default)]
    pub sites: Vec<SiteSection>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSection {
    pub name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSection {
    pub level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSection {
    /// Port to listen on (default: 8080)
    pub port: Option<u16>,
    /// Recommendation history entries kept in memory (default: 1000)
    pub history_capacity: Option<usize>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ForecastSection {
    /// Number of samples the forecaster predicts ahead
    pub horizon_steps: Option<u32>,
    /// Minutes between two forecast samples
    pub step_minutes: Option<u32>,
}

/// Overrides for the decision tables. Omitted tables keep their defaults.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct EngineSection {
    pub scoring: ScoreTables,
    pub weights: Weights,
    pub risk: RiskTables,
    /// Per-pollutant rules replacing the built-in ones.
    pub rules: Option<ActionRules>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SiteSection {
    pub id: String,
    #[serde(default)]
    pub rooms: Vec<RoomSection>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RoomSection {
    pub id: String,
    #[serde(default)]
    pub modules: BTreeMap<ModuleType, ModuleSection>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModuleSection {
    #[serde(default = "default_available")]
    pub available: bool,
    #[serde(default)]
    pub controllable: bool,
    #[serde(default)]
    pub current_state: Option<String>,
    #[serde(default)]
    pub power_levels: Option<Vec<u32>>,
}

fn default_available() -> bool {
    true
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

pub fn load_default() -> Result<Config, ConfigError> {
    load_from_path(DEFAULT_CONFIG_PATH)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    parse(&contents)
}

pub fn parse(contents: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(contents)?;
    config.validate()?;
    Ok(config)
}

impl Config {
    fn validate(&self) -> Result<(), ConfigError> {
        let weights = &self.engine.weights;
        if !weights.is_normalized() {
            return Err(ConfigError::Invalid(format!(
                "engine weights must sum to 1.0, got {:.3}",
                weights.total()
            )));
        }
        if let Some(forecast) = &self.forecast
            && forecast.step_minutes == Some(0)
        {
            return Err(ConfigError::Invalid(
                "forecast.step_minutes must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the server port (default: 8080)
    pub fn server_port(&self) -> u16 {
        self.server
            .as_ref()
            .and_then(|s| s.port)
            .unwrap_or(DEFAULT_SERVER_PORT)
    }

    pub fn history_capacity(&self) -> usize {
        self.server
            .as_ref()
            .and_then(|s| s.history_capacity)
            .unwrap_or(DEFAULT_HISTORY_CAPACITY)
    }

    /// Forecast horizon in minutes (default: 6 steps of 5 minutes).
    pub fn forecast_minutes(&self) -> u32 {
        let (steps, step_minutes) = match &self.forecast {
            Some(section) => (
                section.horizon_steps.unwrap_or(DEFAULT_HORIZON_STEPS),
                section.step_minutes.unwrap_or(DEFAULT_STEP_MINUTES),
            ),
            None => (DEFAULT_HORIZON_STEPS, DEFAULT_STEP_MINUTES),
        };
        steps.saturating_mul(step_minutes)
    }

    pub fn engine(&self) -> Engine {
        let rules = match &self.engine.rules {
            Some(overrides) => ActionRules::standard().merged(overrides.clone()),
            None => ActionRules::standard(),
        };
        Engine {
            tables: self.engine.scoring.clone(),
            weights: self.engine.weights,
            trend: TrendAnalyzer::new(self.engine.risk.clone(), self.forecast_minutes()),
            rules,
        }
    }

    pub fn actuator_registry(&self) -> Result<ActuatorRegistry, crate::actuator::ProfileError> {
        ActuatorRegistry::from_sites(&self.sites)
    }

    /// Maximum log level from `[logging].level`, if it names one.
    pub fn log_level(&self) -> Option<tracing::Level> {
        self.logging.level.trim().parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::rules::ActionType;
    use crate::scoring::PollutantKind;
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    const MINIMAL: &str = r#"
[app]
name = "iaq-flow"

[logging]
level = "info"
"#;

    #[test]
    fn default_config_loads_with_sites() -> Result<(), Box<dyn std::error::Error>> {
        let config = load_default()?;
        let registry = config.actuator_registry()?;
        assert!(registry.room_count() > 0);
        Ok(())
    }

    #[test]
    fn minimal_config_uses_defaults() -> Result<(), Box<dyn std::error::Error>> {
        let config = parse(MINIMAL)?;

        assert_eq!(config.server_port(), DEFAULT_SERVER_PORT);
        assert_eq!(config.history_capacity(), DEFAULT_HISTORY_CAPACITY);
        assert_eq!(config.forecast_minutes(), 30);
        assert_eq!(config.log_level(), Some(tracing::Level::INFO));
        assert_eq!(config.engine(), Engine::default());
        Ok(())
    }

    #[test]
    fn engine_overrides_replace_tables() -> Result<(), Box<dyn std::error::Error>> {
        let contents = format!(
            r#"{MINIMAL}
[forecast]
horizon_steps = 12

[engine.scoring.co2]
excellent = 450.0
good = 600.0
moderate = 800.0
poor = 1000.0

[engine.rules.co2]
primary = ["ventilation"]

[engine.rules.co2.actions]
ventilation = ["boost_ventilation"]
"#
        );
        let config = parse(&contents)?;
        let engine = config.engine();

        assert_eq!(config.forecast_minutes(), 60);
        assert_eq!(engine.trend.horizon_minutes, 60);
        assert_eq!(engine.tables.score(PollutantKind::Co2, 700.0), 60);
        assert_eq!(engine.tables.score(PollutantKind::Pm25, 5.0), 100);
        let co2 = engine.rules.rule(PollutantKind::Co2).expect("co2 rule");
        assert_eq!(
            co2.candidates(ModuleType::Ventilation),
            &[ActionType::BoostVentilation]
        );
        assert!(engine.rules.rule(PollutantKind::Pm25).is_some());
        Ok(())
    }

    #[test]
    fn unnormalized_weights_are_rejected() {
        let contents = format!(
            r#"{MINIMAL}
[engine.weights]
co2 = 0.5
pm25 = 0.5
tvoc = 0.5
humidity = 0.5
"#
        );

        assert!(matches!(parse(&contents), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn modules_default_to_available_but_not_controllable() -> Result<(), Box<dyn std::error::Error>>
    {
        let contents = format!(
            r#"{MINIMAL}
[[sites]]
id = "home"

[[sites.rooms]]
id = "kitchen"

[sites.rooms.modules.purifier]
"#
        );
        let config = parse(&contents)?;
        let registry = config.actuator_registry()?;
        let profile = registry.get("home", "kitchen").expect("kitchen profile");
        let purifier = profile.module(ModuleType::Purifier).expect("purifier");

        assert!(purifier.is_available);
        assert!(!purifier.is_controllable);
        assert!(profile.usable(ModuleType::Purifier).is_none());
        Ok(())
    }

    #[test]
    fn unknown_module_type_is_a_parse_error() {
        let contents = format!(
            r#"{MINIMAL}
[[sites]]
id = "home"

[[sites.rooms]]
id = "kitchen"

[sites.rooms.modules.dehumidifier]
controllable = true
"#
        );

        assert!(matches!(parse(&contents), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn missing_config_file_returns_read_error() {
        let temp_dir = std::env::temp_dir();
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        let path = temp_dir.join(format!("iaq-config-missing-{unique}.toml"));

        let result = load_from_path(&path);

        assert!(matches!(result, Err(ConfigError::Read(_))));
    }

    #[test]
    fn invalid_toml_returns_parse_error() -> Result<(), Box<dyn std::error::Error>> {
        let temp_dir = std::env::temp_dir();
        let unique = SystemTime::now().duration_since(UNIX_EPOCH)?.as_nanos();
        let path = temp_dir.join(format!("iaq-config-invalid-{unique}.toml"));
        fs::write(&path, "not = [valid")?;

        let result = load_from_path(&path);
        let _ = fs::remove_file(&path);

        assert!(matches!(result, Err(ConfigError::Parse(_))));
        Ok(())
    }

    #[test]
    fn unknown_log_level_is_none() -> Result<(), Box<dyn std::error::Error>> {
        let mut config = parse(MINIMAL)?;
        config.logging.level = "chatty".to_string();
        assert_eq!(config.log_level(), None);
        Ok(())
    }
}
