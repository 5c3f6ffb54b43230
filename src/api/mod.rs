use crate::state::AppState;
use axum::Router;
use axum::routing::{get, post};
use std::sync::{Arc, RwLock};

pub mod handlers;
pub mod responses;

pub fn router(state: Arc<RwLock<AppState>>) -> Router {
    Router::new()
        .route("/api/health", get(handlers::get_health))
        .route("/api/iaq/score", post(handlers::post_score))
        .route("/api/iaq/evaluate", post(handlers::post_evaluate))
        .route("/api/iaq/risk", post(handlers::post_risk))
        .route("/api/room-modules", get(handlers::get_room_modules))
        .route("/api/recommendations", get(handlers::get_recommendations))
        .route(
            "/api/recommendations/stats",
            get(handlers::get_recommendation_stats),
        )
        .route("/api/execute-action", post(handlers::post_execute_action))
        .route("/api/actions-log", get(handlers::get_actions_log))
        .route("/api/actions-stats", get(handlers::get_actions_stats))
        .with_state(state)
}
