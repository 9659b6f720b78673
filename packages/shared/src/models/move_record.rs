use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::game_session::Color;

/// One accepted move. Written once, never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveRecord {
    pub game_id: String,
    pub ply: u32,
    pub from: String,
    pub to: String,
    pub promotion: Option<String>,
    pub san: String,
    pub position_after: String,
    pub created_at: DateTime<Utc>,
}

impl MoveRecord {
    /// Side that played this move, assuming the game started from the initial position.
    pub fn color(&self) -> Color {
        if self.ply % 2 == 0 {
            Color::White
        } else {
            Color::Black
        }
    }

    /// 1-based move number of this ply.
    pub fn move_number(&self) -> u32 {
        self.ply / 2 + 1
    }
}
