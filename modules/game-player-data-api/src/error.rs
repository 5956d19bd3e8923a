use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use game_player_data_common::PlayerDataError;
use serde::Serialize;
use thiserror::Error;

pub type QueryResult<T> = std::result::Result<T, QueryError>;

/// Caller-facing query failures. Store internals never leak into the message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl QueryError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<PlayerDataError> for QueryError {
    fn from(err: PlayerDataError) -> Self {
        match err {
            PlayerDataError::InvalidPlayerId(_) | PlayerDataError::UnsupportedGameMode(_) => {
                Self::InvalidArgument(err.to_string())
            }
            // A stored record that cannot be decoded or has the wrong shape.
            _ => Self::internal("failed to load player data"),
        }
    }
}

// Malformed requests stay inside the closed error set instead of axum's
// plain-text 415/422 rejections.
impl From<JsonRejection> for QueryError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidArgument(rejection.body_text())
    }
}

impl From<QueryRejection> for QueryError {
    fn from(rejection: QueryRejection) -> Self {
        Self::InvalidArgument(rejection.body_text())
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_error_kind() {
        assert_eq!(QueryError::invalid_argument("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(QueryError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(QueryError::internal("x").status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn caller_mistakes_are_invalid_arguments() {
        let err: QueryError = PlayerDataError::InvalidPlayerId("nope".into()).into();
        assert!(matches!(err, QueryError::InvalidArgument(_)));

        let err: QueryError = PlayerDataError::UnsupportedGameMode("PARKOUR".into()).into();
        assert!(matches!(err, QueryError::InvalidArgument(_)));
    }

    #[test]
    fn decode_failures_do_not_leak_details() {
        let err: QueryError = PlayerDataError::PayloadDecode {
            mode: game_player_data_common::GameMode::BlockSumo,
            reason: "invalid type: string \"secret\"".into(),
        }
        .into();
        assert_eq!(err, QueryError::internal("failed to load player data"));
    }
}
