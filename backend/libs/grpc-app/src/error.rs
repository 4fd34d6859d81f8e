//! Error types for server assembly and startup

use thiserror::Error;

/// Result type for builder and lifecycle operations
pub type Result<T> = std::result::Result<T, AppError>;

/// Errors raised while assembling or running the server.
///
/// Every variant is fatal for the process: call-scoped failures are
/// `tonic::Status` values and never surface here.
#[derive(Debug, Error)]
pub enum AppError {
    /// Options applied out of lifecycle order, or invalid builder input
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Bind/accept/serve failure from the gRPC transport
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Telemetry provider could not be built or shut down
    #[error("telemetry error: {0}")]
    Telemetry(String),

    /// The serving task panicked or was cancelled
    #[error("server task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl AppError {
    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a telemetry error
    pub fn telemetry(msg: impl Into<String>) -> Self {
        Self::Telemetry(msg.into())
    }
}

impl From<tonic::transport::Error> for AppError {
    fn from(err: tonic::transport::Error) -> Self {
        Self::Transport(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_message() {
        let err = AppError::configuration("interceptors are frozen");
        assert_eq!(err.to_string(), "configuration error: interceptors are frozen");
    }

    #[test]
    fn test_telemetry_error_message() {
        let err = AppError::telemetry("exporter unavailable");
        assert_eq!(err.to_string(), "telemetry error: exporter unavailable");
    }
}
