//! Error types for the stretch stage.

use thiserror::Error;

use crate::core::types::AudioFormat;

/// Errors surfaced by format negotiation, parameter validation and configuration.
#[derive(Error, Debug)]
pub enum ProcessorError {
    /// The input format cannot be handled by the stage.
    #[error("unsupported audio format: {0}")]
    UnsupportedFormat(AudioFormat),

    /// A speed, pitch or tuning value was not finite and positive.
    #[error("invalid {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    /// Configuration could not be serialized or parsed.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type.
pub type Result<T> = std::result::Result<T, ProcessorError>;
