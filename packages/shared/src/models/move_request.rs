use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveRequest {
    pub game_id: String,
    pub credential: String,
    pub from: String,                // e.g., "e2"
    pub to: String,                  // e.g., "e4"
    pub promotion: Option<String>,   // e.g., "q" for queen
}

impl MoveRequest {
    pub fn new(game_id: &str, credential: &str, from: &str, to: &str) -> Self {
        MoveRequest {
            game_id: game_id.to_string(),
            credential: credential.to_string(),
            from: from.to_string(),
            to: to.to_string(),
            promotion: None,
        }
    }

    pub fn with_promotion(
        game_id: &str,
        credential: &str,
        from: &str,
        to: &str,
        promotion: &str,
    ) -> Self {
        MoveRequest {
            promotion: Some(promotion.to_string()),
            ..MoveRequest::new(game_id, credential, from, to)
        }
    }

    /// Shape check done before the rules engine sees the move.
    pub fn is_well_formed(&self) -> bool {
        is_square(&self.from)
            && is_square(&self.to)
            && self.promotion.as_deref().map_or(true, is_promotion_piece)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawAction {
    Offer,
    Accept,
}

/// Exactly a file `a-h` followed by a rank `1-8`.
pub fn is_square(square: &str) -> bool {
    let bytes = square.as_bytes();
    bytes.len() == 2 && (b'a'..=b'h').contains(&bytes[0]) && (b'1'..=b'8').contains(&bytes[1])
}

pub fn is_promotion_piece(piece: &str) -> bool {
    matches!(piece, "q" | "r" | "b" | "n")
}
