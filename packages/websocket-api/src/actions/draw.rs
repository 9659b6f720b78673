use lambda_runtime::Error;
use shared::models::move_request::DrawAction;

use super::{publish, reject};
use crate::{messages::SessionRequest, state::AppState, WebSocketResponse};

pub async fn handle_draw(
    connection_id: &str,
    request: SessionRequest,
    action: DrawAction,
    state: &AppState,
) -> Result<WebSocketResponse, Error> {
    match state
        .game_session_service
        .handle_draw_locked(&request.game_id, &request.credential, action)
        .await
    {
        Ok(committed) => {
            publish(
                state,
                &request.game_id,
                connection_id,
                &committed.outcome.events(),
            )
            .await
        }
        Err(e) => reject(state, &request.game_id, connection_id, &e, None).await,
    }
}
