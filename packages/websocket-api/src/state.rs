use std::sync::Arc;

use shared::services::game_session_service::GameSessionService;
use shared::services::websocket_service::WebSocketService;

#[derive(Clone)]
pub struct AppState {
    pub websocket_service: Arc<WebSocketService>,
    pub game_session_service: Arc<GameSessionService>,
}
