pub mod connection_repository;
pub mod errors;
pub mod game_repository;
pub mod in_memory_connection_repository;
pub mod in_memory_game_repository;
