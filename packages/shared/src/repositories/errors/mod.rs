pub mod connection_repository_errors;
pub mod game_repository_errors;
