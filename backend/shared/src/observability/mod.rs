//! Observability utilities shared by the function binaries

pub mod logging;

pub use logging::*;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObservabilityError {
    #[error("Logging setup error: {0}")]
    Logging(String),

    #[error("Invalid observability setting: {0}")]
    InvalidSetting(String),
}

pub type ObservabilityResult<T> = Result<T, ObservabilityError>;
