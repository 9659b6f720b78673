use std::sync::Arc;

use crate::{
    models::game_session::{Color, GameSession},
    repositories::{
        errors::game_repository_errors::GameSessionRepositoryError,
        game_repository::GameSessionRepository,
    },
};

/// Outcome of checking a credential against a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Granted(Color),
    NotFound,
    Invalid,
}

impl Access {
    pub fn color(self) -> Option<Color> {
        match self {
            Access::Granted(color) => Some(color),
            _ => None,
        }
    }

    /// Pure check against an already loaded session.
    pub fn check(game_session: Option<&GameSession>, credential: &str) -> Self {
        match game_session {
            None => Access::NotFound,
            Some(session) => session
                .color_for(credential)
                .map_or(Access::Invalid, Access::Granted),
        }
    }
}

/// Resolves `(game id, credential)` to the color it authorizes. Reads the
/// session every time; nothing is cached between actions.
#[derive(Clone)]
pub struct AccessGuard {
    repository: Arc<dyn GameSessionRepository + Send + Sync>,
}

impl AccessGuard {
    pub fn new(repository: Arc<dyn GameSessionRepository + Send + Sync>) -> Self {
        AccessGuard { repository }
    }

    pub async fn resolve_color(
        &self,
        game_id: &str,
        credential: &str,
    ) -> Result<Access, GameSessionRepositoryError> {
        let game_session = self.repository.find_by_id(game_id).await?;
        Ok(Access::check(game_session.as_ref(), credential))
    }
}
