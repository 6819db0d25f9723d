use thiserror::Error;

/// Errors produced by type parsing and validation.
#[derive(Debug, Error, PartialEq)]
pub enum TypeError {
    #[error("unknown entity type: {0}")]
    UnknownEntityType(String),

    #[error("unknown severity: {0}")]
    UnknownSeverity(String),

    #[error("unknown compliance family: {0}")]
    UnknownFamily(String),

    #[error("coordinates out of range: lat={latitude}, lon={longitude}")]
    InvalidCoordinates { latitude: f64, longitude: f64 },
}
