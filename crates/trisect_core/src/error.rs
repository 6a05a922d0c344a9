//! Engine Error Types

use thiserror::Error;

/// Errors that can occur in the compressor engine and analyzer driver
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    #[error("Value {value} for parameter {name:?} is not a finite number")]
    InvalidParameterValue { name: String, value: f32 },

    #[error("Failed to (de)serialize parameter state: {0}")]
    StateError(#[from] serde_json::Error),

    #[error("DSP error: {0}")]
    DspError(#[from] trisect_dsp::DspError),

    #[error("Failed to spawn analyzer thread: {0}")]
    ThreadSpawnError(#[from] std::io::Error),

    #[error("Channel send error - receiver dropped")]
    ChannelSendError,
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
