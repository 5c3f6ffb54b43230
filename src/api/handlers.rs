use crate::api::responses::{
    ActionStatsResponse, ActionsLogResponse, ErrorCode, ErrorResponse, EvaluationSuccessResponse,
    ExecutionEntry, ExecutionSuccessResponse, HealthStatus, HealthSuccessResponse,
    RecommendationEntry, RecommendationStatsResponse, RecommendationsResponse, RiskSuccessResponse,
    RoomModulesResponse, ScoreSuccessResponse,
};
use crate::execution::{ActionExecution, ExecutionError, ExecutionRecord};
use crate::history::{DEFAULT_QUERY_LIMIT, HistoryFilter};
use crate::scoring::PollutantKind;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use std::time::SystemTime;
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{error, info, warn};

const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";
const SIMULATED_EXECUTION_MESSAGE: &str = "Action executed (simulation mode)";

type SharedState = Arc<RwLock<AppState>>;

#[derive(Debug, Error)]
enum TimestampError {
    #[error("timestamp format error: {0}")]
    Format(#[from] time::error::Format),
}

#[derive(Debug, Deserialize)]
pub struct ScoreRequest {
    pub readings: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub site_id: String,
    pub room_id: String,
    pub readings: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct RiskRequest {
    pub current: Map<String, Value>,
    #[serde(default)]
    pub predicted: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct RoomQuery {
    pub site_id: String,
    pub room_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct LogQuery {
    pub site_id: Option<String>,
    pub room_id: Option<String>,
    pub limit: Option<usize>,
}

pub enum ApiResponse<T> {
    Success { status: StatusCode, body: T },
    Error { status: StatusCode, body: ErrorResponse },
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        match self {
            ApiResponse::Success { status, body } => (status, Json(body)).into_response(),
            ApiResponse::Error { status, body } => (status, Json(body)).into_response(),
        }
    }
}

pub async fn get_health(State(state): State<SharedState>) -> impl IntoResponse {
    build_health_response(state, SystemTime::now())
}

pub async fn post_score(
    State(state): State<SharedState>,
    Json(request): Json<ScoreRequest>,
) -> impl IntoResponse {
    build_score_response(state, request, SystemTime::now())
}

pub async fn post_evaluate(
    State(state): State<SharedState>,
    Json(request): Json<EvaluateRequest>,
) -> impl IntoResponse {
    build_evaluate_response(state, request, SystemTime::now())
}

pub async fn post_risk(
    State(state): State<SharedState>,
    Json(request): Json<RiskRequest>,
) -> impl IntoResponse {
    build_risk_response(state, request, SystemTime::now())
}

pub async fn get_room_modules(
    State(state): State<SharedState>,
    Query(query): Query<RoomQuery>,
) -> impl IntoResponse {
    build_room_modules_response(state, query, SystemTime::now())
}

pub async fn get_recommendations(
    State(state): State<SharedState>,
    Query(query): Query<LogQuery>,
) -> impl IntoResponse {
    build_recommendations_response(state, query, SystemTime::now())
}

pub async fn get_recommendation_stats(State(state): State<SharedState>) -> impl IntoResponse {
    build_stats_response(state, SystemTime::now())
}

pub async fn post_execute_action(
    State(state): State<SharedState>,
    Json(request): Json<ActionExecution>,
) -> impl IntoResponse {
    build_execute_response(state, request, SystemTime::now())
}

pub async fn get_actions_log(
    State(state): State<SharedState>,
    Query(query): Query<LogQuery>,
) -> impl IntoResponse {
    build_actions_log_response(state, query, SystemTime::now())
}

pub async fn get_actions_stats(State(state): State<SharedState>) -> impl IntoResponse {
    build_actions_stats_response(state, SystemTime::now())
}

fn build_health_response(state: SharedState, now: SystemTime) -> ApiResponse<HealthSuccessResponse> {
    let (sites, rooms) = match state.read() {
        Ok(guard) => (guard.registry().site_count(), guard.registry().room_count()),
        Err(_) => return internal_error("/api/health", "state lock poisoned while reading registry"),
    };

    let timestamp = match format_timestamp(now) {
        Ok(formatted) => formatted,
        Err(_) => return internal_error("/api/health", "timestamp formatting failure"),
    };

    let status = if rooms == 0 {
        HealthStatus::Degraded
    } else {
        HealthStatus::Ok
    };

    ApiResponse::Success {
        status: StatusCode::OK,
        body: HealthSuccessResponse {
            status,
            sites,
            rooms,
            timestamp,
        },
    }
}

fn build_score_response(
    state: SharedState,
    request: ScoreRequest,
    now: SystemTime,
) -> ApiResponse<ScoreSuccessResponse> {
    let readings = numeric_readings(&request.readings);
    if readings.is_empty() {
        return invalid_readings("readings must contain at least one numeric value", now);
    }

    let score = match state.read() {
        Ok(guard) => guard.engine().aggregate(readings),
        Err(_) => return internal_error("/api/iaq/score", "state lock poisoned while reading engine"),
    };

    match format_timestamp(now) {
        Ok(timestamp) => ApiResponse::Success {
            status: StatusCode::OK,
            body: ScoreSuccessResponse { score, timestamp },
        },
        Err(_) => internal_error("/api/iaq/score", "timestamp formatting failure"),
    }
}

fn build_evaluate_response(
    state: SharedState,
    request: EvaluateRequest,
    now: SystemTime,
) -> ApiResponse<EvaluationSuccessResponse> {
    let readings = numeric_readings(&request.readings);
    if readings.is_empty() {
        return invalid_readings("readings must contain at least one numeric value", now);
    }

    let mut guard = match state.write() {
        Ok(guard) => guard,
        Err(_) => {
            return internal_error("/api/iaq/evaluate", "state lock poisoned while evaluating");
        }
    };
    let profile = guard.profile(&request.site_id, &request.room_id);
    let evaluation = guard.engine().evaluate(readings, &profile);
    guard.record_evaluation(evaluation.clone(), now);
    drop(guard);

    info!(
        site_id = %evaluation.site_id,
        room_id = %evaluation.room_id,
        global_score = evaluation.score.global_score,
        actions = evaluation.actions.len(),
        "Room evaluated"
    );

    match format_timestamp(now) {
        Ok(timestamp) => ApiResponse::Success {
            status: StatusCode::OK,
            body: EvaluationSuccessResponse {
                evaluation,
                timestamp,
            },
        },
        Err(_) => internal_error("/api/iaq/evaluate", "timestamp formatting failure"),
    }
}

fn build_risk_response(
    state: SharedState,
    request: RiskRequest,
    now: SystemTime,
) -> ApiResponse<RiskSuccessResponse> {
    let current = pollutant_readings(&request.current);
    if current.is_empty() {
        return invalid_readings("current must contain at least one known pollutant", now);
    }
    let predicted = pollutant_readings(&request.predicted);

    let (forecast_minutes, analysis) = match state.read() {
        Ok(guard) => {
            let engine = guard.engine();
            (
                engine.trend.horizon_minutes,
                engine.analyze(&current, &predicted),
            )
        }
        Err(_) => return internal_error("/api/iaq/risk", "state lock poisoned while reading engine"),
    };

    match format_timestamp(now) {
        Ok(timestamp) => ApiResponse::Success {
            status: StatusCode::OK,
            body: RiskSuccessResponse {
                forecast_minutes,
                analysis,
                timestamp,
            },
        },
        Err(_) => internal_error("/api/iaq/risk", "timestamp formatting failure"),
    }
}

fn build_room_modules_response(
    state: SharedState,
    query: RoomQuery,
    now: SystemTime,
) -> ApiResponse<RoomModulesResponse> {
    let profile = match state.read() {
        Ok(guard) => guard.registry().get(&query.site_id, &query.room_id).cloned(),
        Err(_) => {
            return internal_error("/api/room-modules", "state lock poisoned while reading registry");
        }
    };

    let timestamp = match format_timestamp(now) {
        Ok(formatted) => formatted,
        Err(_) => return internal_error("/api/room-modules", "timestamp formatting failure"),
    };

    match profile {
        Some(profile) => ApiResponse::Success {
            status: StatusCode::OK,
            body: RoomModulesResponse {
                modules: profile.modules().cloned().collect(),
                site_id: profile.site_id,
                room_id: profile.room_id,
                timestamp,
            },
        },
        None => ApiResponse::Error {
            status: StatusCode::NOT_FOUND,
            body: ErrorResponse {
                error_code: ErrorCode::NotFound,
                error_message: format!(
                    "No modules configured for room {}/{}",
                    query.site_id, query.room_id
                ),
                timestamp,
            },
        },
    }
}

fn build_recommendations_response(
    state: SharedState,
    query: LogQuery,
    now: SystemTime,
) -> ApiResponse<RecommendationsResponse> {
    let filter = HistoryFilter {
        site_id: query.site_id,
        room_id: query.room_id,
    };
    let limit = query.limit.unwrap_or(DEFAULT_QUERY_LIMIT);

    let records = match state.read() {
        Ok(guard) => guard.history().query(&filter, limit),
        Err(_) => {
            return internal_error("/api/recommendations", "state lock poisoned while reading history");
        }
    };

    let mut entries = Vec::with_capacity(records.len());
    for record in records {
        match format_timestamp(record.timestamp) {
            Ok(recorded_at) => entries.push(RecommendationEntry {
                recorded_at,
                evaluation: record.evaluation,
            }),
            Err(_) => return internal_error("/api/recommendations", "record timestamp formatting failure"),
        }
    }

    match format_timestamp(now) {
        Ok(timestamp) => ApiResponse::Success {
            status: StatusCode::OK,
            body: RecommendationsResponse { entries, timestamp },
        },
        Err(_) => internal_error("/api/recommendations", "timestamp formatting failure"),
    }
}

fn build_stats_response(
    state: SharedState,
    now: SystemTime,
) -> ApiResponse<RecommendationStatsResponse> {
    let stats = match state.read() {
        Ok(guard) => guard.history().stats(),
        Err(_) => {
            return internal_error(
                "/api/recommendations/stats",
                "state lock poisoned while reading history",
            );
        }
    };

    let most_recent = match stats.most_recent.map(format_timestamp).transpose() {
        Ok(most_recent) => most_recent,
        Err(_) => {
            return internal_error("/api/recommendations/stats", "timestamp formatting failure");
        }
    };
    let timestamp = match format_timestamp(now) {
        Ok(formatted) => formatted,
        Err(_) => {
            return internal_error("/api/recommendations/stats", "timestamp formatting failure");
        }
    };

    ApiResponse::Success {
        status: StatusCode::OK,
        body: RecommendationStatsResponse {
            total_entries: stats.total_entries,
            total_actions: stats.total_actions,
            by_room: stats.by_room,
            by_pollutant: stats.by_pollutant,
            by_module: stats.by_module,
            by_action_type: stats.by_action_type,
            by_priority: stats.by_priority,
            most_recent,
            timestamp,
        },
    }
}

fn build_execute_response(
    state: SharedState,
    request: ActionExecution,
    now: SystemTime,
) -> ApiResponse<ExecutionSuccessResponse> {
    let result = match state.write() {
        Ok(mut guard) => guard.execute_action(request, now),
        Err(_) => {
            return internal_error("/api/execute-action", "state lock poisoned while executing");
        }
    };

    let timestamp = match format_timestamp(now) {
        Ok(formatted) => formatted,
        Err(_) => return internal_error("/api/execute-action", "timestamp formatting failure"),
    };

    match result {
        Ok(record) => ApiResponse::Success {
            status: StatusCode::OK,
            body: ExecutionSuccessResponse {
                action: ExecutionEntry {
                    executed_at: timestamp.clone(),
                    status: record.status,
                    action: record.action,
                },
                message: SIMULATED_EXECUTION_MESSAGE.to_string(),
                timestamp,
            },
        },
        Err(err) => {
            warn!(error = %err, "Action rejected");
            let (status, error_code) = match &err {
                ExecutionError::ModuleNotFound { .. } => (StatusCode::NOT_FOUND, ErrorCode::NotFound),
                ExecutionError::NotControllable { .. } => {
                    (StatusCode::BAD_REQUEST, ErrorCode::ModuleNotControllable)
                }
                ExecutionError::Unavailable { .. } => {
                    (StatusCode::BAD_REQUEST, ErrorCode::ModuleUnavailable)
                }
            };
            ApiResponse::Error {
                status,
                body: ErrorResponse {
                    error_code,
                    error_message: err.to_string(),
                    timestamp,
                },
            }
        }
    }
}

fn build_actions_log_response(
    state: SharedState,
    query: LogQuery,
    now: SystemTime,
) -> ApiResponse<ActionsLogResponse> {
    let filter = HistoryFilter {
        site_id: query.site_id,
        room_id: query.room_id,
    };
    let limit = query.limit.unwrap_or(DEFAULT_QUERY_LIMIT);

    let records = match state.read() {
        Ok(guard) => guard.executions().query(&filter, limit),
        Err(_) => {
            return internal_error("/api/actions-log", "state lock poisoned while reading actions");
        }
    };

    let entries = match records
        .into_iter()
        .map(execution_entry)
        .collect::<Result<Vec<_>, _>>()
    {
        Ok(entries) => entries,
        Err(_) => return internal_error("/api/actions-log", "record timestamp formatting failure"),
    };

    match format_timestamp(now) {
        Ok(timestamp) => ApiResponse::Success {
            status: StatusCode::OK,
            body: ActionsLogResponse { entries, timestamp },
        },
        Err(_) => internal_error("/api/actions-log", "timestamp formatting failure"),
    }
}

fn build_actions_stats_response(
    state: SharedState,
    now: SystemTime,
) -> ApiResponse<ActionStatsResponse> {
    let stats = match state.read() {
        Ok(guard) => guard.executions().stats(),
        Err(_) => {
            return internal_error("/api/actions-stats", "state lock poisoned while reading actions");
        }
    };

    let most_recent = match stats.most_recent.map(format_timestamp).transpose() {
        Ok(most_recent) => most_recent,
        Err(_) => return internal_error("/api/actions-stats", "timestamp formatting failure"),
    };
    let timestamp = match format_timestamp(now) {
        Ok(formatted) => formatted,
        Err(_) => return internal_error("/api/actions-stats", "timestamp formatting failure"),
    };

    ApiResponse::Success {
        status: StatusCode::OK,
        body: ActionStatsResponse {
            total_actions: stats.total_actions,
            by_room: stats.by_room,
            by_module: stats.by_module,
            by_action_type: stats.by_action_type,
            by_priority: stats.by_priority,
            most_recent,
            timestamp,
        },
    }
}

fn execution_entry(record: ExecutionRecord) -> Result<ExecutionEntry, TimestampError> {
    Ok(ExecutionEntry {
        executed_at: format_timestamp(record.timestamp)?,
        status: record.status,
        action: record.action,
    })
}

/// Numeric readings in request order; other JSON values are dropped.
fn numeric_readings(readings: &Map<String, Value>) -> Vec<(String, f64)> {
    readings
        .iter()
        .filter_map(|(key, value)| match value.as_f64() {
            Some(number) => Some((key.clone(), number)),
            None => {
                warn!(pollutant = %key, value = %value, "Ignoring non-numeric reading");
                None
            }
        })
        .collect()
}

fn pollutant_readings(readings: &Map<String, Value>) -> BTreeMap<PollutantKind, f64> {
    let mut parsed = BTreeMap::new();
    for (key, number) in numeric_readings(readings) {
        match key.parse::<PollutantKind>() {
            Ok(kind) => {
                parsed.entry(kind).or_insert(number);
            }
            Err(err) => warn!(error = %err, "Ignoring reading"),
        }
    }
    parsed
}

fn invalid_readings<T>(message: &str, now: SystemTime) -> ApiResponse<T> {
    match format_timestamp(now) {
        Ok(timestamp) => ApiResponse::Error {
            status: StatusCode::BAD_REQUEST,
            body: ErrorResponse {
                error_code: ErrorCode::InvalidReadings,
                error_message: message.to_string(),
                timestamp,
            },
        },
        Err(_) => internal_error("request validation", "timestamp formatting failure"),
    }
}

fn internal_error<T>(route: &str, message: &str) -> ApiResponse<T> {
    error!(route = route, message = message, "Internal error while handling request");
    let formatted = format_timestamp(SystemTime::now()).unwrap_or_else(|err| {
        error!(error = %err, "Failed to format internal error timestamp");
        "1970-01-01T00:00:00Z".to_string()
    });
    ApiResponse::Error {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: ErrorResponse {
            error_code: ErrorCode::InternalError,
            error_message: INTERNAL_ERROR_MESSAGE.to_string(),
            timestamp: formatted,
        },
    }
}

fn format_timestamp(timestamp: SystemTime) -> Result<String, TimestampError> {
    Ok(OffsetDateTime::from(timestamp).format(&Rfc3339)?)
}
