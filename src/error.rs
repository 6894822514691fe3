use axum::{ http::StatusCode, response::{ IntoResponse, Response }, Json };
use log::error;
use thiserror::Error;

use crate::models::api::ErrorResponse;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("API request failed: {status} {body}")]
    UpstreamStatus {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Upstream stream interrupted: {0}")]
    UpstreamStream(String),

    #[error("Invalid chat request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl RelayError {
    /// Failures to open the upstream stream at all, reported before any
    /// event is written to the client.
    pub fn is_upstream_unavailable(&self) -> bool {
        matches!(self, RelayError::Upstream(_) | RelayError::UpstreamStatus { .. })
    }

    fn status_code(&self) -> StatusCode {
        match self {
            RelayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error = if status.is_server_error() {
            error!("API call error: {}", self);
            "Server error, please try again later"
        } else {
            "Bad request"
        };
        let body = ErrorResponse {
            error: error.to_string(),
            details: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
