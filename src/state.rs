use crate::actuator::RoomActuatorProfile;
use crate::actuator::registry::ActuatorRegistry;
use crate::config::Config;
use crate::engine::{Engine, RoomEvaluation};
use crate::error::AppError;
use crate::execution::{self, ActionExecution, ExecutionError, ExecutionLog, ExecutionRecord};
use crate::history::{BoundedHistory, RecommendationLog, RecommendationRecord};
use std::time::SystemTime;
use tokio::sync::watch;

#[derive(Debug)]
pub struct AppState {
    engine: Engine,
    registry: ActuatorRegistry,
    history: Box<dyn RecommendationLog>,
    executions: ExecutionLog,
    latest: Option<RoomEvaluation>,
    latest_tx: watch::Sender<Option<RoomEvaluation>>,
}

impl AppState {
    pub fn new(engine: Engine, registry: ActuatorRegistry, history: Box<dyn RecommendationLog>) -> Self {
        let (latest_tx, _latest_rx) = watch::channel(None);
        Self {
            engine,
            registry,
            history,
            executions: ExecutionLog::new(crate::config::DEFAULT_HISTORY_CAPACITY),
            latest: None,
            latest_tx,
        }
    }

    /// State built from config: engine tables, actuator registry and logs
    /// sized by `[server].history_capacity`.
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let capacity = config.history_capacity();
        let mut state = Self::new(
            config.engine(),
            config.actuator_registry()?,
            Box::new(BoundedHistory::new(capacity)),
        );
        state.executions = ExecutionLog::new(capacity);
        Ok(state)
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn registry(&self) -> &ActuatorRegistry {
        &self.registry
    }

    /// Profile for a room; unknown rooms get an empty profile.
    pub fn profile(&self, site_id: &str, room_id: &str) -> RoomActuatorProfile {
        self.registry.profile_or_empty(site_id, room_id)
    }

    pub fn history(&self) -> &dyn RecommendationLog {
        self.history.as_ref()
    }

    pub fn executions(&self) -> &ExecutionLog {
        &self.executions
    }

    pub fn latest(&self) -> Option<&RoomEvaluation> {
        self.latest.as_ref()
    }

    pub fn subscribe_evaluations(&self) -> watch::Receiver<Option<RoomEvaluation>> {
        self.latest_tx.subscribe()
    }

    /// Logs an evaluation and publishes it to subscribers.
    ///
    /// The history entry is kept even when nobody is subscribed.
    pub fn record_evaluation(&mut self, evaluation: RoomEvaluation, timestamp: SystemTime) {
        self.history.record(RecommendationRecord {
            timestamp,
            evaluation: evaluation.clone(),
        });
        self.latest = Some(evaluation.clone());
        self.latest_tx.send_replace(Some(evaluation));
    }

    /// Runs an action against the registry and logs it on success.
    ///
    /// Rejected actions leave both the module state and the log untouched.
    pub fn execute_action(
        &mut self,
        action: ActionExecution,
        timestamp: SystemTime,
    ) -> Result<ExecutionRecord, ExecutionError> {
        let record = execution::execute(&mut self.registry, action, timestamp)?;
        self.executions.record(record.clone());
        Ok(record)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(
            Engine::default(),
            ActuatorRegistry::new(),
            Box::new(BoundedHistory::new(crate::config::DEFAULT_HISTORY_CAPACITY)),
        )
    }
}
