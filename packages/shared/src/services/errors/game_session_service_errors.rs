use crate::repositories::errors::game_repository_errors::GameSessionRepositoryError;
use crate::services::errors::rules_engine_errors::RulesEngineError;

/// Why a session action was refused. Everything except `PersistenceFailure`
/// is an expected outcome reported back to the player.
#[derive(Debug, Clone, PartialEq)]
pub enum GameSessionServiceError {
    InvalidToken,
    GameNotFound,
    GameEnded,
    NotYourTurn,
    InvalidMoveFormat,
    MalformedPosition(String),
    PersistenceFailure(GameSessionRepositoryError),
}

impl GameSessionServiceError {
    /// Stable code sent to clients.
    pub fn reason(&self) -> &'static str {
        match self {
            GameSessionServiceError::InvalidToken => "invalid_token",
            GameSessionServiceError::GameNotFound => "game_not_found",
            GameSessionServiceError::GameEnded => "game_ended",
            GameSessionServiceError::NotYourTurn => "not_your_turn",
            GameSessionServiceError::InvalidMoveFormat => "invalid_move_format",
            GameSessionServiceError::MalformedPosition(_) => "malformed_position",
            GameSessionServiceError::PersistenceFailure(_) => "persistence_failure",
        }
    }

    /// Client-facing text. Storage details stay in the logs.
    pub fn message(&self) -> &'static str {
        match self {
            GameSessionServiceError::InvalidToken => "Invalid token",
            GameSessionServiceError::GameNotFound => "Game not found",
            GameSessionServiceError::GameEnded => "Game has ended",
            GameSessionServiceError::NotYourTurn => "Not your turn",
            GameSessionServiceError::InvalidMoveFormat => "Invalid move format",
            GameSessionServiceError::MalformedPosition(_) => "Stored position is corrupt",
            GameSessionServiceError::PersistenceFailure(_) => "Failed to save game state",
        }
    }
}

impl std::fmt::Display for GameSessionServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameSessionServiceError::MalformedPosition(msg) => {
                write!(f, "Malformed position: {}", msg)
            }
            GameSessionServiceError::PersistenceFailure(err) => {
                write!(f, "Persistence failure: {}", err)
            }
            other => write!(f, "{}", other.message()),
        }
    }
}

impl std::error::Error for GameSessionServiceError {}

impl From<GameSessionRepositoryError> for GameSessionServiceError {
    fn from(err: GameSessionRepositoryError) -> Self {
        GameSessionServiceError::PersistenceFailure(err)
    }
}

impl From<RulesEngineError> for GameSessionServiceError {
    fn from(err: RulesEngineError) -> Self {
        match err {
            RulesEngineError::MalformedPosition(msg) => {
                GameSessionServiceError::MalformedPosition(msg)
            }
            RulesEngineError::Illegal(_) => GameSessionServiceError::InvalidMoveFormat,
        }
    }
}
