use lambda_runtime::Error;
use tracing::{error, info};

use crate::{state::AppState, WebSocketResponse};

/// Always succeeds: the client is gone whether or not the record could be removed.
pub async fn handle_disconnect(
    connection_id: &str,
    state: &AppState,
) -> Result<WebSocketResponse, Error> {
    info!("WebSocket connection disconnected: {}", connection_id);

    if let Err(e) = state.websocket_service.disconnect(connection_id).await {
        error!("Failed to remove connection {}: {}", connection_id, e);
    }

    Ok(WebSocketResponse::ok())
}
