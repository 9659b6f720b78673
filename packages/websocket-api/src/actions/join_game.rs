use lambda_runtime::Error;
use tracing::{error, info};

use super::{publish, reject};
use crate::{messages::SessionRequest, state::AppState, WebSocketResponse};

pub async fn handle_join_game(
    connection_id: &str,
    request: SessionRequest,
    state: &AppState,
) -> Result<WebSocketResponse, Error> {
    // The session stays locked until the events are out
    let committed = match state
        .game_session_service
        .join_game_locked(&request.game_id, &request.credential)
        .await
    {
        Ok(committed) => committed,
        Err(e) => return reject(state, &request.game_id, connection_id, &e, None).await,
    };

    let outcome = &committed.outcome;

    if let Err(e) = state
        .websocket_service
        .attach(connection_id, &request.game_id, outcome.color)
        .await
    {
        error!("Failed to attach connection {}: {}", connection_id, e);
        return Ok(WebSocketResponse::error(500, "Failed to store connection"));
    }
    info!(
        "Connection {} joined game {} as {}",
        connection_id, request.game_id, outcome.color
    );

    publish(state, &request.game_id, connection_id, &outcome.events()).await
}
