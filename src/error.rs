use crate::actuator::ProfileError;
use crate::config::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("actuator profile error: {0}")]
    Profile(#[from] ProfileError),
    #[error("state lock poisoned")]
    StateLock,
}
