use lambda_runtime::Error;
use tracing::{error, info};

use crate::{state::AppState, WebSocketResponse};

pub async fn handle_connect(
    connection_id: &str,
    state: &AppState,
) -> Result<WebSocketResponse, Error> {
    info!("WebSocket connection established: {}", connection_id);

    if let Err(e) = state.websocket_service.connect(connection_id).await {
        error!("Failed to store connection {}: {}", connection_id, e);
        return Ok(WebSocketResponse::error(500, "Failed to store connection"));
    }

    Ok(WebSocketResponse::ok())
}
