//! Unified error types for the spin server.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

/// Errors raised while starting or running the server.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Configuration loaded but failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Prometheus recorder could not be installed.
    #[error("metrics error: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors returned by the spin endpoints.
#[derive(Error, Debug)]
pub enum SpinError {
    /// A query parameter was missing or malformed.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Parameter name as it appears in the query string.
        name: &'static str,
        /// What was wrong with it.
        reason: String,
    },

    /// Background work could not be scheduled.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SpinError {
    /// HTTP status this error maps to.
    pub fn status_code(&self) -> StatusCode {
        match self {
            SpinError::InvalidParameter { .. } => StatusCode::BAD_REQUEST,
            SpinError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for SpinError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "Spin request failed");
        }
        (status, self.to_string()).into_response()
    }
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_parameter_maps_to_bad_request() {
        let err = SpinError::InvalidParameter {
            name: "spin_time",
            reason: "missing".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "invalid parameter spin_time: missing");
    }

    #[test]
    fn internal_maps_to_server_error() {
        let err = SpinError::Internal("thread spawn failed".to_string());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
