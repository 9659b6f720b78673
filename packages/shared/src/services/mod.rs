pub mod access_guard;
pub mod errors;
pub mod game_session_service;
pub mod rules_engine;
pub mod session_events;
pub mod session_locks;
pub mod websocket_service;
