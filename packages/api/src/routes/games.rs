use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::{error::ApiError, middleware::auth::PlayerCredential, state::AppState};
use shared::models::{
    game_session::{Color, PublicGame},
    move_record::MoveRecord,
    move_request::MoveRequest,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/games", post(create_game))
        .route("/games/{game_id}", get(get_game))
        .route("/games/{game_id}/moves", get(list_moves))
        .route("/games/{game_id}/moves/validate", post(validate_move))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedGame {
    pub game_id: String,
    pub white_url: String,
    pub black_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MoveHistory {
    pub game_id: String,
    pub moves: Vec<MoveRecord>,
}

#[derive(Debug, Deserialize)]
pub struct ValidateMoveBody {
    pub from: String,
    pub to: String,
    pub promotion: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ValidatedMove {
    pub valid: bool,
    pub san: String,
}

async fn create_game(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<CreatedGame>), ApiError> {
    let game_session = state.game_session_service.create_game().await?;
    info!("Issued join links for game {}", game_session.id);

    let created = CreatedGame {
        white_url: state
            .settings
            .join_url(&game_session.id, game_session.credential_for(Color::White)),
        black_url: state
            .settings
            .join_url(&game_session.id, game_session.credential_for(Color::Black)),
        game_id: game_session.id,
    };
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_game(
    State(state): State<AppState>,
    Path(game_id): Path<String>,
) -> Result<Json<PublicGame>, ApiError> {
    check_game_id(&game_id)?;
    let game_session = state.game_session_service.get_game(&game_id).await?;
    Ok(Json(PublicGame::from(&game_session)))
}

async fn list_moves(
    State(state): State<AppState>,
    Path(game_id): Path<String>,
) -> Result<Json<MoveHistory>, ApiError> {
    check_game_id(&game_id)?;
    let moves = state.game_session_service.list_moves(&game_id).await?;
    Ok(Json(MoveHistory { game_id, moves }))
}

async fn validate_move(
    State(state): State<AppState>,
    Path(game_id): Path<String>,
    PlayerCredential(credential): PlayerCredential,
    Json(body): Json<ValidateMoveBody>,
) -> Result<Json<ValidatedMove>, ApiError> {
    check_game_id(&game_id)?;
    let request = MoveRequest {
        game_id,
        credential,
        from: body.from,
        to: body.to,
        promotion: body.promotion,
    };

    let applied = state.game_session_service.validate_move(&request).await?;
    Ok(Json(ValidatedMove {
        valid: true,
        san: applied.san,
    }))
}

fn check_game_id(game_id: &str) -> Result<(), ApiError> {
    Uuid::parse_str(game_id)
        .map(|_| ())
        .map_err(|_| ApiError::BadRequest("Invalid game ID format".to_string()))
}
