use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{error::ApiError, state::AppState};

/// Seat credential presented as `Authorization: Bearer <credential>`.
/// Only its shape is checked here; the game session service decides which
/// color, if any, it authorizes.
#[derive(Debug, Clone)]
pub struct PlayerCredential(pub String);

impl FromRequestParts<AppState> for PlayerCredential {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("Authorization")
            .ok_or(ApiError::Unauthorized)?
            .to_str()
            .map_err(|_| ApiError::Unauthorized)?;

        let credential = auth_header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|credential| !credential.is_empty())
            .ok_or(ApiError::Unauthorized)?;

        Ok(PlayerCredential(credential.to_string()))
    }
}
