use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::models::game_session::{GameSession, GameStateUpdate};
use crate::models::move_record::MoveRecord;
use crate::repositories::errors::game_repository_errors::GameSessionRepositoryError;
use crate::repositories::game_repository::GameSessionRepository;

/// Process-local store with the same revision checks as the DynamoDB one.
/// Used for local runs and by the test suites of the lambdas.
#[derive(Default)]
pub struct InMemoryGameSessionRepository {
    games: Mutex<HashMap<String, GameSession>>,
    moves: Mutex<HashMap<String, Vec<MoveRecord>>>,
}

impl InMemoryGameSessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a session as-is, replacing any existing one with the same id.
    pub fn insert(&self, game_session: GameSession) {
        if let Ok(mut games) = self.games.lock() {
            games.insert(game_session.id.clone(), game_session);
        }
    }

    fn poisoned<T>(_: T) -> GameSessionRepositoryError {
        GameSessionRepositoryError::DynamoDb("in-memory store lock poisoned".to_string())
    }

    fn apply(
        games: &mut HashMap<String, GameSession>,
        current: &GameSession,
        update: &GameStateUpdate,
    ) -> Result<GameSession, GameSessionRepositoryError> {
        let stored = games
            .get_mut(&current.id)
            .ok_or(GameSessionRepositoryError::Conflict)?;
        if stored.version != current.version {
            return Err(GameSessionRepositoryError::Conflict);
        }
        update.apply_to(stored, Utc::now());
        Ok(stored.clone())
    }
}

#[async_trait]
impl GameSessionRepository for InMemoryGameSessionRepository {
    async fn create_game(
        &self,
        game_session: &GameSession,
    ) -> Result<(), GameSessionRepositoryError> {
        let mut games = self.games.lock().map_err(Self::poisoned)?;
        if games.contains_key(&game_session.id) {
            return Err(GameSessionRepositoryError::Conflict);
        }
        games.insert(game_session.id.clone(), game_session.clone());
        Ok(())
    }

    async fn find_by_id(
        &self,
        game_id: &str,
    ) -> Result<Option<GameSession>, GameSessionRepositoryError> {
        let games = self.games.lock().map_err(Self::poisoned)?;
        Ok(games.get(game_id).cloned())
    }

    async fn update_state(
        &self,
        current: &GameSession,
        update: &GameStateUpdate,
    ) -> Result<Option<GameSession>, GameSessionRepositoryError> {
        let mut games = self.games.lock().map_err(Self::poisoned)?;
        if !games.contains_key(&current.id) {
            return Ok(None);
        }
        Self::apply(&mut games, current, update).map(Some)
    }

    async fn append_move(&self, record: &MoveRecord) -> Result<(), GameSessionRepositoryError> {
        let mut moves = self.moves.lock().map_err(Self::poisoned)?;
        let history = moves.entry(record.game_id.clone()).or_default();
        if history.iter().any(|existing| existing.ply == record.ply) {
            return Err(GameSessionRepositoryError::Conflict);
        }
        history.push(record.clone());
        Ok(())
    }

    async fn commit_move(
        &self,
        current: &GameSession,
        update: &GameStateUpdate,
        record: &MoveRecord,
    ) -> Result<GameSession, GameSessionRepositoryError> {
        // Both locks are held so the pair lands together or not at all
        let mut games = self.games.lock().map_err(Self::poisoned)?;
        let mut moves = self.moves.lock().map_err(Self::poisoned)?;

        let history = moves.entry(record.game_id.clone()).or_default();
        if history.iter().any(|existing| existing.ply == record.ply) {
            return Err(GameSessionRepositoryError::Conflict);
        }
        let committed = Self::apply(&mut games, current, update)?;
        history.push(record.clone());
        Ok(committed)
    }

    async fn list_moves(
        &self,
        game_id: &str,
    ) -> Result<Vec<MoveRecord>, GameSessionRepositoryError> {
        let moves = self.moves.lock().map_err(Self::poisoned)?;
        let mut history = moves.get(game_id).cloned().unwrap_or_default();
        history.sort_by_key(|record| record.ply);
        Ok(history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::game_session::{Color, GameStatus};

    fn record(game_id: &str, ply: u32) -> MoveRecord {
        MoveRecord {
            game_id: game_id.to_string(),
            ply,
            from: "e2".to_string(),
            to: "e4".to_string(),
            promotion: None,
            san: "e4".to_string(),
            position_after: "after".to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let repository = InMemoryGameSessionRepository::new();
        let session = GameSession::new();

        repository.create_game(&session).await.unwrap();

        let found = repository.find_by_id(&session.id).await.unwrap().unwrap();
        assert_eq!(found.white_credential, session.white_credential);
        assert!(repository.find_by_id("missing").await.unwrap().is_none());
        assert_eq!(
            repository.create_game(&session).await,
            Err(GameSessionRepositoryError::Conflict)
        );
    }

    #[tokio::test]
    async fn test_stale_update_is_rejected() {
        let repository = InMemoryGameSessionRepository::new();
        let session = GameSession::new();
        repository.create_game(&session).await.unwrap();
        let update = GameStateUpdate {
            status: Some(GameStatus::Active),
            ..Default::default()
        };

        let updated = repository
            .update_state(&session, &update)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.version, 1);
        assert_eq!(updated.status, GameStatus::Active);

        let stale = repository.update_state(&session, &update).await;
        assert_eq!(stale, Err(GameSessionRepositoryError::Conflict));
    }

    #[tokio::test]
    async fn test_update_of_missing_session_returns_none() {
        let repository = InMemoryGameSessionRepository::new();

        let result = repository
            .update_state(&GameSession::new(), &GameStateUpdate::default())
            .await;

        assert_eq!(result, Ok(None));
    }

    #[tokio::test]
    async fn test_commit_move_is_all_or_nothing() {
        let repository = InMemoryGameSessionRepository::new();
        let session = GameSession::new();
        repository.create_game(&session).await.unwrap();
        let update = GameStateUpdate {
            turn: Some(Color::Black),
            ..Default::default()
        };

        let committed = repository
            .commit_move(&session, &update, &record(&session.id, 0))
            .await
            .unwrap();
        assert_eq!(committed.turn, Color::Black);

        // Stale revision: neither the session nor the history changes
        let result = repository
            .commit_move(&session, &update, &record(&session.id, 1))
            .await;
        assert_eq!(result, Err(GameSessionRepositoryError::Conflict));
        assert_eq!(repository.list_moves(&session.id).await.unwrap().len(), 1);
        assert_eq!(
            repository.find_by_id(&session.id).await.unwrap().unwrap().version,
            1
        );
    }

    #[tokio::test]
    async fn test_list_moves_in_ply_order() {
        let repository = InMemoryGameSessionRepository::new();

        repository.append_move(&record("game", 1)).await.unwrap();
        repository.append_move(&record("game", 0)).await.unwrap();
        assert_eq!(
            repository.append_move(&record("game", 0)).await,
            Err(GameSessionRepositoryError::Conflict)
        );

        let plies: Vec<u32> = repository
            .list_moves("game")
            .await
            .unwrap()
            .iter()
            .map(|record| record.ply)
            .collect();
        assert_eq!(plies, vec![0, 1]);
        assert!(repository.list_moves("other").await.unwrap().is_empty());
    }
}
