//! Outbound vocabulary relayed to the players of a session.
//!
//! The orchestrator produces these values; transports decide how to address
//! and deliver them (see [`Audience`]).

use serde::{Deserialize, Serialize};

use crate::models::game_session::{Color, EndReason, GameResult, GameSession, GameStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastMove {
    pub from: String,
    pub to: String,
    pub san: String,
}

/// Full observable state of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub game_id: String,
    pub position: String,
    pub turn: Color,
    pub status: GameStatus,
    pub result: GameResult,
    pub ended_reason: Option<EndReason>,
    /// Committed version of the session; later states carry higher values.
    pub version: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_move: Option<LastMove>,
    /// Only set on the copy addressed to the player who just joined.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_color: Option<Color>,
}

impl Snapshot {
    pub fn of(session: &GameSession) -> Self {
        Snapshot {
            game_id: session.id.clone(),
            position: session.position.clone(),
            turn: session.turn,
            status: session.status,
            result: session.result,
            ended_reason: session.ended_reason,
            version: session.version,
            record: session.record.clone(),
            last_move: None,
            player_color: None,
        }
    }

    pub fn with_last_move(mut self, last_move: LastMove) -> Self {
        self.last_move = Some(last_move);
        self
    }

    pub fn for_player(mut self, color: Color) -> Self {
        self.player_color = Some(color);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rejection {
    pub reason: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalNotice {
    pub result: GameResult,
    pub reason: EndReason,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceNotice {
    pub player_color: Color,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawOfferNotice {
    pub offered_by: Color,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum SessionEvent {
    GameState(Snapshot),
    Rejected(Rejection),
    GameEnded(TerminalNotice),
    PlayerJoined(PresenceNotice),
    DrawOffered(DrawOfferNotice),
}

/// Who receives an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// Every participant connected to the session.
    Session,
    /// Only the connection that performed the action.
    Actor,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutboundEvent {
    pub audience: Audience,
    pub event: SessionEvent,
}

impl OutboundEvent {
    pub fn broadcast(event: SessionEvent) -> Self {
        OutboundEvent {
            audience: Audience::Session,
            event,
        }
    }

    pub fn unicast(event: SessionEvent) -> Self {
        OutboundEvent {
            audience: Audience::Actor,
            event,
        }
    }
}
