use lambda_runtime::Error;

use super::{publish, reject};
use crate::{messages::SessionRequest, state::AppState, WebSocketResponse};

pub async fn handle_resign(
    connection_id: &str,
    request: SessionRequest,
    state: &AppState,
) -> Result<WebSocketResponse, Error> {
    match state
        .game_session_service
        .resign_locked(&request.game_id, &request.credential)
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
