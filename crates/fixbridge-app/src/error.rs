//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] fixbridge_telemetry::TelemetryError),

    #[error("API error: {0}")]
    Api(#[from] fixbridge_api::ApiError),
}

pub type AppResult<T> = Result<T, AppError>;
