use lambda_runtime::Error;
use shared::services::session_events::sync_events;
use tracing::error;

use super::{publish, reject};
use crate::{messages::SessionRequest, state::AppState, WebSocketResponse};

/// Resends the current state to a reconnecting client and re-attaches the
/// connection so it receives the session's broadcasts again.
pub async fn handle_sync_state(
    connection_id: &str,
    request: SessionRequest,
    state: &AppState,
) -> Result<WebSocketResponse, Error> {
    let snapshot = match state
        .game_session_service
        .sync_state(&request.game_id, &request.credential)
        .await
    {
        Ok(snapshot) => snapshot,
        Err(e) => return reject(state, &request.game_id, connection_id, &e, None).await,
    };

    if let Some(color) = snapshot.player_color {
        if let Err(e) = state
            .websocket_service
            .attach(connection_id, &request.game_id, color)
            .await
        {
            error!("Failed to attach connection {}: {}", connection_id, e);
            return Ok(WebSocketResponse::error(500, "Failed to store connection"));
        }
    }

    publish(state, &request.game_id, connection_id, &sync_events(snapshot)).await
}
