use crate::actuator::ActuatorCapability;
use crate::engine::RoomEvaluation;
use crate::execution::{ActionExecution, ExecutionStatus};
use crate::scoring::composite::CompositeScoreResult;
use crate::scoring::trend::RiskAnalysis;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Degraded,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct HealthSuccessResponse {
    pub status: HealthStatus,
    pub sites: usize,
    pub rooms: usize,
    pub timestamp: String,
}

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    InvalidReadings,
    ModuleNotControllable,
    ModuleUnavailable,
    InternalError,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ErrorResponse {
    pub error_code: ErrorCode,
    pub error_message: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct ScoreSuccessResponse {
    #[serde(flatten)]
    pub score: CompositeScoreResult,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct EvaluationSuccessResponse {
    #[serde(flatten)]
    pub evaluation: RoomEvaluation,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct RiskSuccessResponse {
    pub forecast_minutes: u32,
    #[serde(flatten)]
    pub analysis: RiskAnalysis,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct RoomModulesResponse {
    pub site_id: String,
    pub room_id: String,
    pub modules: Vec<ActuatorCapability>,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct RecommendationEntry {
    pub recorded_at: String,
    #[serde(flatten)]
    pub evaluation: RoomEvaluation,
}

#[derive(Debug, Serialize)]
pub struct RecommendationsResponse {
    pub entries: Vec<RecommendationEntry>,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct RecommendationStatsResponse {
    pub total_entries: usize,
    pub total_actions: usize,
    pub by_room: BTreeMap<String, usize>,
    pub by_pollutant: BTreeMap<String, usize>,
    pub by_module: BTreeMap<String, usize>,
    pub by_action_type: BTreeMap<String, usize>,
    pub by_priority: BTreeMap<String, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub most_recent: Option<String>,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct ExecutionEntry {
    pub executed_at: String,
    pub status: ExecutionStatus,
    #[serde(flatten)]
    pub action: ActionExecution,
}

#[derive(Debug, Serialize)]
pub struct ExecutionSuccessResponse {
    pub action: ExecutionEntry,
    pub message: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct ActionsLogResponse {
    pub entries: Vec<ExecutionEntry>,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct ActionStatsResponse {
    pub total_actions: usize,
    pub by_room: BTreeMap<String, usize>,
    pub by_module: BTreeMap<String, usize>,
    pub by_action_type: BTreeMap<String, usize>,
    pub by_priority: BTreeMap<String, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub most_recent: Option<String>,
    pub timestamp: String,
}
