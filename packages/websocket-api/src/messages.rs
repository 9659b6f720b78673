//! Frames exchanged on the `$default` route.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use shared::models::move_request::MoveRequest;

const ACTIONS: [&str; 7] = [
    "join_game",
    "make_move",
    "resign",
    "offer_draw",
    "accept_draw",
    "sync_state",
    "ping",
];

/// Identifies a seat in a game.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SessionRequest {
    #[serde(alias = "gameId")]
    pub game_id: String,
    #[serde(alias = "token")]
    pub credential: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MoveMessage {
    #[serde(alias = "gameId")]
    pub game_id: String,
    #[serde(alias = "token")]
    pub credential: String,
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub promotion: Option<String>,
}

impl From<MoveMessage> for MoveRequest {
    fn from(message: MoveMessage) -> Self {
        MoveRequest {
            game_id: message.game_id,
            credential: message.credential,
            from: message.from,
            to: message.to,
            promotion: message.promotion,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientMessage {
    JoinGame(SessionRequest),
    MakeMove(MoveMessage),
    Resign(SessionRequest),
    OfferDraw(SessionRequest),
    AcceptDraw(SessionRequest),
    SyncState(SessionRequest),
    Ping,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MessageError {
    InvalidJson,
    MissingAction,
    UnknownAction(String),
    InvalidPayload(String),
}

impl fmt::Display for MessageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageError::InvalidJson => write!(f, "Invalid JSON format"),
            MessageError::MissingAction => write!(f, "No action specified"),
            MessageError::UnknownAction(_) => write!(f, "Unknown action"),
            MessageError::InvalidPayload(msg) => write!(f, "Invalid message: {}", msg),
        }
    }
}

impl std::error::Error for MessageError {}

impl ClientMessage {
    pub fn parse(body: &str) -> Result<Self, MessageError> {
        let value: Value = serde_json::from_str(body).map_err(|_| MessageError::InvalidJson)?;
        let action = value
            .get("action")
            .and_then(Value::as_str)
            .ok_or(MessageError::MissingAction)?;
        if !ACTIONS.contains(&action) {
            return Err(MessageError::UnknownAction(action.to_string()));
        }

        serde_json::from_value(value).map_err(|e| MessageError::InvalidPayload(e.to_string()))
    }
}

/// Replies that are not part of a game's event stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ControlFrame {
    Pong {
        timestamp: DateTime<Utc>,
    },
    Error {
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl ControlFrame {
    pub fn pong() -> Self {
        ControlFrame::Pong {
            timestamp: Utc::now(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ControlFrame::Error {
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}
