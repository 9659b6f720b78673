pub mod game_session_service_errors;
pub mod rules_engine_errors;
