use iaq_flow::config::Config;
use iaq_flow::error::AppError;
use iaq_flow::state::AppState;
use iaq_flow::{api, config};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, RwLock};
use tokio::sync::watch;

fn init_tracing(level: tracing::Level) {
    let subscriber = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(level)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Reads the config file and builds the service state from it.
fn load_state(path: impl AsRef<Path>) -> Result<(Config, AppState), AppError> {
    let config = config::load_from_path(path)?;
    let state = AppState::from_config(&config)?;
    Ok((config, state))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (config, app_state) = load_state(config::DEFAULT_CONFIG_PATH)?;
    let level = config.log_level();
    init_tracing(level.unwrap_or(tracing::Level::INFO));
    if level.is_none() {
        tracing::warn!(level = %config.logging.level, "Unknown log level, using info");
    }
    tracing::info!(
        config_path = config::DEFAULT_CONFIG_PATH,
        app = %config.app.name,
        "iaq-flow starting"
    );

    tracing::info!(
        sites = app_state.registry().site_count(),
        rooms = app_state.registry().room_count(),
        forecast_minutes = app_state.engine().trend.horizon_minutes,
        history_capacity = config.history_capacity(),
        "Engine configured"
    );

    let evaluations = app_state.subscribe_evaluations();
    let state = Arc::new(RwLock::new(app_state));

    tokio::spawn(log_evaluations(evaluations));

    let app = api::router(Arc::clone(&state));
    let port = config.server_port();
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "API server listening");
    axum::serve(listener, app).await?;

    Ok(())
}

/// Logs every evaluation that triggered corrective actions.
async fn log_evaluations(
    mut receiver: watch::Receiver<Option<iaq_flow::engine::RoomEvaluation>>,
) {
    while receiver.changed().await.is_ok() {
        let latest = receiver.borrow_and_update().clone();
        let Some(evaluation) = latest else {
            continue;
        };
        for action in &evaluation.actions {
            tracing::info!(
                site_id = %action.site_id,
                room_id = %action.room_id,
                action = %action.action_type,
                module = %action.module_type,
                priority = %action.priority,
                pollutant = %action.reason.pollutant,
                "Corrective action recommended"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iaq_flow::config::ConfigError;

    #[test]
    fn default_config_is_valid_toml() -> Result<(), Box<dyn std::error::Error>> {
        let (_config, state) = load_state(config::DEFAULT_CONFIG_PATH)?;
        assert_eq!(state.registry().room_count(), 2);
        Ok(())
    }

    #[test]
    fn missing_config_file_is_a_config_error() {
        let path = std::env::temp_dir().join("iaq_flow_missing_config.toml");
        let _ = std::fs::remove_file(&path);

        let result = load_state(&path);

        assert!(matches!(result, Err(AppError::Config(ConfigError::Read(_)))));
    }
}
