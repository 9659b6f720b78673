pub mod connect;
pub mod default;
pub mod disconnect;
pub mod draw;
pub mod join_game;
pub mod make_move;
pub mod resign;
pub mod sync_state;

use lambda_runtime::Error;
use tracing::{error, warn};

use crate::{messages::ControlFrame, state::AppState, WebSocketResponse};
use shared::models::{events::OutboundEvent, move_request::MoveRequest};
use shared::services::{
    errors::game_session_service_errors::GameSessionServiceError, session_events::rejection,
};

/// Hands the events to the delivery service, in order.
async fn publish(
    state: &AppState,
    game_id: &str,
    connection_id: &str,
    events: &[OutboundEvent],
) -> Result<WebSocketResponse, Error> {
    if let Err(e) = state
        .websocket_service
        .deliver(game_id, connection_id, events)
        .await
    {
        error!("Failed to deliver events for game {}: {}", game_id, e);
        return Ok(WebSocketResponse::error(500, "Failed to send response"));
    }

    Ok(WebSocketResponse::ok())
}

/// Tells only the acting connection why its request was refused.
async fn reject(
    state: &AppState,
    game_id: &str,
    connection_id: &str,
    error: &GameSessionServiceError,
    attempted: Option<&MoveRequest>,
) -> Result<WebSocketResponse, Error> {
    match error {
        GameSessionServiceError::PersistenceFailure(_)
        | GameSessionServiceError::MalformedPosition(_) => {
            error!("Failed to process request for game {}: {}", game_id, error)
        }
        _ => warn!("Rejected request for game {}: {}", game_id, error.reason()),
    }

    publish(state, game_id, connection_id, &[rejection(error, attempted)]).await
}

async fn reply(
    state: &AppState,
    connection_id: &str,
    frame: &ControlFrame,
) -> Result<WebSocketResponse, Error> {
    let message = serde_json::to_string(frame)?;

    if let Err(e) = state.websocket_service.reply(connection_id, &message).await {
        error!("Failed to send response to {}: {}", connection_id, e);
        return Ok(WebSocketResponse::error(500, "Failed to send response"));
    }

    Ok(WebSocketResponse::ok())
}
