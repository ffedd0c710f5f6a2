//! Error types for Salah Clock

use thiserror::Error;

/// Errors that can occur while computing or sourcing prayer times
#[derive(Debug, Error)]
pub enum PrayerError {
    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("Invalid calculation parameters: {0}")]
    InvalidParameters(String),

    #[error("Cannot resolve {prayer} for {date}: {reason}")]
    Unresolvable {
        prayer: String,
        date: String,
        reason: String,
    },

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid time of day: {0}")]
    InvalidTime(String),

    #[error("Failed to parse timings payload: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Data source unavailable: {0}")]
    DataSource(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown location: {0}")]
    UnknownLocation(String),

    #[error("Unknown calculation method: {0}")]
    UnknownMethod(String),
}
