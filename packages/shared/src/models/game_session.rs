use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub const STARTING_POSITION: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Waiting,
    Active,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn opposite(self) -> Self {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// The result that awards the game to this color.
    pub fn win(self) -> GameResult {
        match self {
            Color::White => GameResult::WhiteWin,
            Color::Black => GameResult::BlackWin,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::White => write!(f, "white"),
            Color::Black => write!(f, "black"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameResult {
    WhiteWin,
    BlackWin,
    Draw,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    Checkmate,
    Stalemate,
    Resignation,
    DrawAgreement,
    // Reserved for clocks; nothing ends a game this way yet.
    Timeout,
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSession {
    pub id: String,
    pub status: GameStatus,
    pub white_credential: String,
    pub black_credential: String,
    pub position: String,
    pub record: Option<String>,
    pub turn: Color,
    pub result: GameResult,
    pub ended_reason: Option<EndReason>,
    pub white_joined: bool,
    pub black_joined: bool,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GameSession {
    pub fn new() -> Self {
        let now = Utc::now();
        GameSession {
            id: Uuid::new_v4().to_string(),
            status: GameStatus::Waiting,
            white_credential: Uuid::new_v4().to_string(),
            black_credential: Uuid::new_v4().to_string(),
            position: STARTING_POSITION.to_string(),
            record: None,
            turn: Color::White,
            result: GameResult::Unknown,
            ended_reason: None,
            white_joined: false,
            black_joined: false,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Exact-match lookup of the color a credential authorizes.
    pub fn color_for(&self, credential: &str) -> Option<Color> {
        if credential.is_empty() {
            None
        } else if self.white_credential == credential {
            Some(Color::White)
        } else if self.black_credential == credential {
            Some(Color::Black)
        } else {
            None
        }
    }

    pub fn credential_for(&self, color: Color) -> &str {
        match color {
            Color::White => &self.white_credential,
            Color::Black => &self.black_credential,
        }
    }

    pub fn has_joined(&self, color: Color) -> bool {
        match color {
            Color::White => self.white_joined,
            Color::Black => self.black_joined,
        }
    }

    pub fn is_ended(&self) -> bool {
        self.status == GameStatus::Ended
    }
}

impl Default for GameSession {
    fn default() -> Self {
        Self::new()
    }
}

// Credentials stay out of logs.
impl fmt::Debug for GameSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameSession")
            .field("id", &self.id)
            .field("status", &self.status)
            .field("white_credential", &"<redacted>")
            .field("black_credential", &"<redacted>")
            .field("position", &self.position)
            .field("turn", &self.turn)
            .field("result", &self.result)
            .field("ended_reason", &self.ended_reason)
            .field("white_joined", &self.white_joined)
            .field("black_joined", &self.black_joined)
            .field("version", &self.version)
            .finish()
    }
}

/// Partial update of the mutable session fields. Unset fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameStateUpdate {
    pub position: Option<String>,
    pub turn: Option<Color>,
    pub status: Option<GameStatus>,
    pub result: Option<GameResult>,
    pub ended_reason: Option<EndReason>,
    pub record: Option<String>,
    pub white_joined: Option<bool>,
    pub black_joined: Option<bool>,
}

impl GameStateUpdate {
    pub fn ended(result: GameResult, reason: EndReason) -> Self {
        GameStateUpdate {
            status: Some(GameStatus::Ended),
            result: Some(result),
            ended_reason: Some(reason),
            ..Default::default()
        }
    }

    pub fn joined(color: Color) -> Self {
        match color {
            Color::White => GameStateUpdate {
                white_joined: Some(true),
                ..Default::default()
            },
            Color::Black => GameStateUpdate {
                black_joined: Some(true),
                ..Default::default()
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == GameStateUpdate::default()
    }

    /// Applies the update in place and bumps the revision, the way every store
    /// implementation must.
    pub fn apply_to(&self, session: &mut GameSession, now: DateTime<Utc>) {
        if let Some(position) = &self.position {
            session.position = position.clone();
        }
        if let Some(turn) = self.turn {
            session.turn = turn;
        }
        if let Some(status) = self.status {
            session.status = status;
        }
        if let Some(result) = self.result {
            session.result = result;
        }
        if let Some(reason) = self.ended_reason {
            session.ended_reason = Some(reason);
        }
        if let Some(record) = &self.record {
            session.record = Some(record.clone());
        }
        if let Some(joined) = self.white_joined {
            session.white_joined = joined;
        }
        if let Some(joined) = self.black_joined {
            session.black_joined = joined;
        }
        session.version += 1;
        session.updated_at = now;
    }
}

/// Publicly visible game state. Never carries credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicGame {
    pub id: String,
    pub status: GameStatus,
    pub position: String,
    pub record: Option<String>,
    pub turn: Color,
    pub result: GameResult,
    pub ended_reason: Option<EndReason>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&GameSession> for PublicGame {
    fn from(session: &GameSession) -> Self {
        PublicGame {
            id: session.id.clone(),
            status: session.status,
            position: session.position.clone(),
            record: session.record.clone(),
            turn: session.turn,
            result: session.result,
            ended_reason: session.ended_reason,
            created_at: session.created_at,
            updated_at: session.updated_at,
        }
    }
}
