pub mod connection;
pub mod events;
pub mod game_session;
pub mod move_record;
pub mod move_request;
