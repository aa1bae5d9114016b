//! Queue errors.

use thiserror::Error;

use crate::job::JobId;

/// Queue error types.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Invalid queue configuration.
    #[error("Invalid configuration: {0}")]
    Config(#[from] durq_config::ConfigError),

    /// The storage handle is not open.
    #[error("Queue is not open")]
    NotOpen,

    /// Storage engine failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Payload could not be encoded.
    #[error("Failed to encode payload: {0}")]
    Encode(String),

    /// A stored payload could not be decoded.
    #[error("Failed to decode payload of job {id}: {message}")]
    Decode { id: JobId, message: String },

    /// The mirrored state no longer matches the store.
    #[error("Queue out of sync with store: {0}")]
    Desync(String),

    /// `done` was called without a delivered job.
    #[error("No job has been delivered")]
    NoActiveJob,
}

impl From<tokio_rusqlite::Error> for QueueError {
    fn from(err: tokio_rusqlite::Error) -> Self {
        QueueError::Storage(err.to_string())
    }
}

impl From<rusqlite::Error> for QueueError {
    fn from(err: rusqlite::Error) -> Self {
        QueueError::Storage(err.to_string())
    }
}

impl From<std::io::Error> for QueueError {
    fn from(err: std::io::Error) -> Self {
        QueueError::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_names_job() {
        let err = QueueError::Decode {
            id: JobId::new(42),
            message: "expected value".to_string(),
        };
        let display = err.to_string();
        assert!(display.contains("42"));
        assert!(display.contains("expected value"));
    }

    #[test]
    fn test_config_error_from() {
        let err = QueueError::from(durq_config::ConfigError::NotFound("durq.toml".to_string()));
        assert!(matches!(err, QueueError::Config(_)));
        assert!(err.to_string().contains("durq.toml"));
    }

    #[test]
    fn test_rusqlite_error_from() {
        let err = QueueError::from(rusqlite::Error::QueryReturnedNoRows);
        assert!(matches!(err, QueueError::Storage(_)));
    }
}
