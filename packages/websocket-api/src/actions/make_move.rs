use lambda_runtime::Error;
use shared::models::move_request::MoveRequest;

use super::{publish, reject};
use crate::{state::AppState, WebSocketResponse};

pub async fn handle_make_move(
    connection_id: &str,
    request: MoveRequest,
    state: &AppState,
) -> Result<WebSocketResponse, Error> {
    // The session stays locked until the events are out
    match state.game_session_service.apply_move_locked(&request).await {
        Ok(committed) => {
            publish(
                state,
                &request.game_id,
                connection_id,
                &committed.outcome.events(),
            )
            .await
        }
        Err(e) => reject(state, &request.game_id, connection_id, &e, Some(&request)).await,
    }
}
