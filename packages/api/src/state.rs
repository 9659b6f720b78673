use std::sync::Arc;

use shared::config::ApiSettings;
use shared::services::game_session_service::GameSessionService;

#[derive(Clone)]
pub struct AppState {
    pub game_session_service: Arc<GameSessionService>,
    pub settings: Arc<ApiSettings>,
}
