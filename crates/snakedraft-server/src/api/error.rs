// Mapping from engine errors to HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use snakedraft_core::{DraftError, ErrorCode};
use tracing::error;

/// An engine error on its way out as `{code, error}` JSON.
#[derive(Debug)]
pub struct ApiError(pub DraftError);

impl From<DraftError> for ApiError {
    fn from(e: DraftError) -> Self {
        Self(e)
    }
}

pub fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::NotYourTurn
        | ErrorCode::PlayerAlreadyDrafted
        | ErrorCode::InvalidConfig
        | ErrorCode::UnknownParticipant
        | ErrorCode::UnknownPlayer => StatusCode::BAD_REQUEST,
        ErrorCode::DraftNotFound => StatusCode::NOT_FOUND,
        ErrorCode::DraftComplete
        | ErrorCode::TurnChanged
        | ErrorCode::DraftFailed
        | ErrorCode::NoPlayersAvailable => StatusCode::CONFLICT,
        ErrorCode::LedgerUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::LedgerError | ErrorCode::CatalogError | ErrorCode::InvariantViolation => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.0.code();
        if !self.0.is_client_error() {
            error!(code = %code, "request failed: {}", self.0);
        }
        let body = Json(json!({
            "code": code.as_str(),
            "error": self.0.to_string(),
        }));
        (status_for(code), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snakedraft_core::ledger::LedgerError;

    #[test]
    fn client_errors_map_to_4xx() {
        let err = DraftError::NotYourTurn {
            participant_id: "p2".into(),
            overall: 3,
        };
        assert_eq!(status_for(err.code()), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_for(DraftError::DraftNotFound("d".into()).code()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(DraftError::TurnChanged { overall: 4 }.code()),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn ledger_errors_map_to_5xx() {
        let busy = DraftError::from(LedgerError::Unavailable("database is locked".into()));
        assert_eq!(status_for(busy.code()), StatusCode::SERVICE_UNAVAILABLE);

        let corrupt = DraftError::from(LedgerError::Corrupt("bad row".into()));
        assert_eq!(status_for(corrupt.code()), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
