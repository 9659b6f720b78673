use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::game_session::Color;

/// A live WebSocket connection, attached to a game once the player joins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerConnection {
    pub connection_id: String,
    // Absent rather than null: game_id keys the lookup index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    pub connected_at: DateTime<Utc>,
}

impl PlayerConnection {
    pub fn new(connection_id: &str) -> Self {
        PlayerConnection {
            connection_id: connection_id.to_string(),
            game_id: None,
            color: None,
            connected_at: Utc::now(),
        }
    }

    pub fn joined(connection_id: &str, game_id: &str, color: Color) -> Self {
        PlayerConnection {
            game_id: Some(game_id.to_string()),
            color: Some(color),
            ..PlayerConnection::new(connection_id)
        }
    }
}
