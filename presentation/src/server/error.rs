//! HTTP error mapping

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use council_application::LeaderboardError;
use council_domain::DomainError;
use serde_json::json;
use thiserror::Error;
use tracing::warn;

/// Request-level failures; a run that has started reports problems as events instead
#[derive(Error, Debug)]
pub enum CouncilError {
    #[error("Unknown council: {0}")]
    UnknownCouncil(String),

    #[error("No council configured")]
    NoCouncil,

    #[error(transparent)]
    InvalidRequest(#[from] DomainError),

    #[error("Leaderboard unavailable: {0}")]
    Leaderboard(#[from] LeaderboardError),
}

impl CouncilError {
    pub fn status(&self) -> StatusCode {
        match self {
            CouncilError::UnknownCouncil(_) | CouncilError::NoCouncil => StatusCode::NOT_FOUND,
            CouncilError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CouncilError::Leaderboard(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for CouncilError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!("Request failed: {}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_errors_to_status_codes() {
        assert_eq!(
            CouncilError::UnknownCouncil("x".to_string()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            CouncilError::InvalidRequest(DomainError::InvalidQuery("empty".to_string())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            CouncilError::Leaderboard(LeaderboardError::Corrupt("bad".to_string())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
