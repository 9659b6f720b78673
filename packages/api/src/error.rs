use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use shared::services::errors::game_session_service_errors::GameSessionServiceError;

#[derive(Debug)]
pub enum ApiError {
    GameSessionService(GameSessionServiceError),
    BadRequest(String),
    Unauthorized,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub reason: String,
}

impl From<GameSessionServiceError> for ApiError {
    fn from(error: GameSessionServiceError) -> Self {
        ApiError::GameSessionService(error)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::GameSessionService(GameSessionServiceError::InvalidToken) => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::GameSessionService(GameSessionServiceError::GameNotFound) => {
                StatusCode::NOT_FOUND
            }
            ApiError::GameSessionService(
                GameSessionServiceError::GameEnded | GameSessionServiceError::NotYourTurn,
            ) => StatusCode::CONFLICT,
            ApiError::GameSessionService(GameSessionServiceError::InvalidMoveFormat) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::GameSessionService(GameSessionServiceError::MalformedPosition(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::GameSessionService(GameSessionServiceError::PersistenceFailure(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }

    fn body(&self) -> ErrorResponse {
        match self {
            ApiError::GameSessionService(e) => ErrorResponse {
                error: e.message().to_string(),
                reason: e.reason().to_string(),
            },
            ApiError::BadRequest(message) => ErrorResponse {
                error: message.clone(),
                reason: "bad_request".to_string(),
            },
            ApiError::Unauthorized => ErrorResponse {
                error: "Missing or malformed Authorization header".to_string(),
                reason: "invalid_token".to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            if let ApiError::GameSessionService(e) = &self {
                error!("Request failed: {}", e);
            }
        }

        (status, Json(self.body())).into_response()
    }
}
