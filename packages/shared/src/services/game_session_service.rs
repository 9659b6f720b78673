use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, warn};

use crate::{
    models::{
        events::{LastMove, Snapshot, TerminalNotice},
        game_session::{Color, EndReason, GameResult, GameSession, GameStateUpdate, GameStatus},
        move_record::MoveRecord,
        move_request::{DrawAction, MoveRequest},
    },
    repositories::{
        errors::game_repository_errors::GameSessionRepositoryError,
        game_repository::GameSessionRepository,
    },
    services::{
        access_guard::{Access, AccessGuard},
        errors::game_session_service_errors::GameSessionServiceError,
        rules_engine::{AppliedMove, GamePosition, PositionHistory, RulesEngine},
        session_locks::SessionLocks,
    },
};

/// How many times a mutation is re-run from a fresh read after losing a
/// write race to another process.
pub const MAX_COMMIT_ATTEMPTS: usize = 3;

/// Result of an accepted move, resignation or agreed draw.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionOutcome {
    pub actor: Color,
    pub snapshot: Snapshot,
    /// Set only when this action ended the game.
    pub terminal: Option<TerminalNotice>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinOutcome {
    pub color: Color,
    /// Addressed to the joining player, so it carries their color.
    pub snapshot: Snapshot,
    /// True when this join moved the session from waiting to active.
    pub activated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOutcome {
    Offered { by: Color },
    Agreed(ActionOutcome),
}

/// An outcome returned while the session's write lock is still held.
/// Callers that relay the outcome keep it alive until delivery finishes, so
/// listeners see states in the order they were committed.
#[derive(Debug)]
pub struct Committed<T> {
    pub outcome: T,
    _guard: OwnedMutexGuard<()>,
}

impl<T> Committed<T> {
    fn new(outcome: T, guard: OwnedMutexGuard<()>) -> Self {
        Committed {
            outcome,
            _guard: guard,
        }
    }

    /// Releases the lock.
    pub fn into_inner(self) -> T {
        self.outcome
    }
}

#[derive(Clone)]
pub struct GameSessionService {
    repository: Arc<dyn GameSessionRepository + Send + Sync>,
    rules_engine: Arc<dyn RulesEngine>,
    access_guard: AccessGuard,
    locks: SessionLocks,
}

impl GameSessionService {
    pub fn new(
        repository: Arc<dyn GameSessionRepository + Send + Sync>,
        rules_engine: Arc<dyn RulesEngine>,
    ) -> Self {
        GameSessionService {
            access_guard: AccessGuard::new(repository.clone()),
            repository,
            rules_engine,
            locks: SessionLocks::new(),
        }
    }

    pub async fn create_game(&self) -> Result<GameSession, GameSessionServiceError> {
        let game_session = GameSession::new();
        self.repository.create_game(&game_session).await?;
        info!("Created game session {}", game_session.id);
        Ok(game_session)
    }

    pub async fn get_game(&self, game_id: &str) -> Result<GameSession, GameSessionServiceError> {
        self.load_session(game_id).await
    }

    /// Full current state, including the most recent move when there is one.
    pub async fn snapshot(&self, game_id: &str) -> Result<Snapshot, GameSessionServiceError> {
        let game_session = self.load_session(game_id).await?;
        let moves = self.repository.list_moves(game_id).await?;
        Ok(snapshot_with_last_move(&game_session, &moves))
    }

    /// Snapshot for a reconnecting player, tagged with their color.
    pub async fn sync_state(
        &self,
        game_id: &str,
        credential: &str,
    ) -> Result<Snapshot, GameSessionServiceError> {
        let color = self.authorize(game_id, credential).await?;
        Ok(self.snapshot(game_id).await?.for_player(color))
    }

    pub async fn list_moves(
        &self,
        game_id: &str,
    ) -> Result<Vec<MoveRecord>, GameSessionServiceError> {
        self.load_session(game_id).await?;
        Ok(self.repository.list_moves(game_id).await?)
    }

    /// Marks the credential's color as joined and activates the session once
    /// both colors are in. Ended sessions can still be joined to read their
    /// final state.
    pub async fn join_game(
        &self,
        game_id: &str,
        credential: &str,
    ) -> Result<JoinOutcome, GameSessionServiceError> {
        self.join_game_locked(game_id, credential)
            .await
            .map(Committed::into_inner)
    }

    pub async fn join_game_locked(
        &self,
        game_id: &str,
        credential: &str,
    ) -> Result<Committed<JoinOutcome>, GameSessionServiceError> {
        let color = self.authorize(game_id, credential).await?;
        let guard = self.locks.acquire(game_id).await;

        let outcome = self
            .retry_on_conflict(game_id, || self.try_join(game_id, color))
            .await?;
        Ok(Committed::new(outcome, guard))
    }

    /// Idempotent `waiting -> active` promotion.
    pub async fn activate(&self, game_id: &str) -> Result<GameSession, GameSessionServiceError> {
        let _lock = self.locks.acquire(game_id).await;

        self.retry_on_conflict(game_id, || self.try_activate(game_id))
            .await
    }

    pub async fn apply_move(
        &self,
        request: &MoveRequest,
    ) -> Result<ActionOutcome, GameSessionServiceError> {
        self.apply_move_locked(request)
            .await
            .map(Committed::into_inner)
    }

    pub async fn apply_move_locked(
        &self,
        request: &MoveRequest,
    ) -> Result<Committed<ActionOutcome>, GameSessionServiceError> {
        info!(
            "Processing move {}-{} for game {}",
            request.from, request.to, request.game_id
        );
        let color = self.authorize(&request.game_id, &request.credential).await?;
        let guard = self.locks.acquire(&request.game_id).await;

        let outcome = self
            .retry_on_conflict(&request.game_id, || self.try_apply_move(request, color))
            .await?;
        Ok(Committed::new(outcome, guard))
    }

    /// Runs every check `apply_move` would, without persisting anything.
    pub async fn validate_move(
        &self,
        request: &MoveRequest,
    ) -> Result<AppliedMove, GameSessionServiceError> {
        let color = self.authorize(&request.game_id, &request.credential).await?;
        let game_session = self.load_session(&request.game_id).await?;
        let (_, applied, _) = self.play(&game_session, request, color).await?;
        Ok(applied)
    }

    pub async fn resign(
        &self,
        game_id: &str,
        credential: &str,
    ) -> Result<ActionOutcome, GameSessionServiceError> {
        self.resign_locked(game_id, credential)
            .await
            .map(Committed::into_inner)
    }

    pub async fn resign_locked(
        &self,
        game_id: &str,
        credential: &str,
    ) -> Result<Committed<ActionOutcome>, GameSessionServiceError> {
        let color = self.authorize(game_id, credential).await?;
        let guard = self.locks.acquire(game_id).await;

        info!("Player {} resigning game {}", color, game_id);
        let outcome = self
            .retry_on_conflict(game_id, || {
                self.try_end(game_id, color, color.opposite().win(), EndReason::Resignation)
            })
            .await?;
        Ok(Committed::new(outcome, guard))
    }

    /// An offer is only acknowledged. Accepting ends the game as a draw
    /// whether or not an offer was made.
    pub async fn handle_draw(
        &self,
        game_id: &str,
        credential: &str,
        action: DrawAction,
    ) -> Result<DrawOutcome, GameSessionServiceError> {
        self.handle_draw_locked(game_id, credential, action)
            .await
            .map(Committed::into_inner)
    }

    /// Offers take the lock too, so an offer is never relayed after the
    /// end of the game it refers to.
    pub async fn handle_draw_locked(
        &self,
        game_id: &str,
        credential: &str,
        action: DrawAction,
    ) -> Result<Committed<DrawOutcome>, GameSessionServiceError> {
        let color = self.authorize(game_id, credential).await?;
        let guard = self.locks.acquire(game_id).await;

        let outcome = match action {
            DrawAction::Offer => {
                let game_session = self.load_session(game_id).await?;
                if game_session.is_ended() {
                    return Err(GameSessionServiceError::GameEnded);
                }
                debug!("Player {} offered a draw in game {}", color, game_id);
                DrawOutcome::Offered { by: color }
            }
            DrawAction::Accept => DrawOutcome::Agreed(
                self.retry_on_conflict(game_id, || {
                    self.try_end(game_id, color, GameResult::Draw, EndReason::DrawAgreement)
                })
                .await?,
            ),
        };
        Ok(Committed::new(outcome, guard))
    }

    async fn authorize(
        &self,
        game_id: &str,
        credential: &str,
    ) -> Result<Color, GameSessionServiceError> {
        match self.access_guard.resolve_color(game_id, credential).await? {
            Access::Granted(color) => Ok(color),
            Access::NotFound | Access::Invalid => {
                warn!("Rejected credential for game {}", game_id);
                Err(GameSessionServiceError::InvalidToken)
            }
        }
    }

    async fn load_session(&self, game_id: &str) -> Result<GameSession, GameSessionServiceError> {
        self.repository
            .find_by_id(game_id)
            .await?
            .ok_or(GameSessionServiceError::GameNotFound)
    }

    async fn write_state(
        &self,
        game_session: &GameSession,
        update: &GameStateUpdate,
    ) -> Result<GameSession, GameSessionServiceError> {
        self.repository
            .update_state(game_session, update)
            .await?
            .ok_or(GameSessionServiceError::GameNotFound)
    }

    /// Re-runs `operation` from scratch while it keeps losing to concurrent writers.
    async fn retry_on_conflict<T, F, Fut>(
        &self,
        game_id: &str,
        mut operation: F,
    ) -> Result<T, GameSessionServiceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GameSessionServiceError>>,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Err(GameSessionServiceError::PersistenceFailure(
                    GameSessionRepositoryError::Conflict,
                )) if attempt < MAX_COMMIT_ATTEMPTS => {
                    warn!(
                        "Concurrent write on game {}, retrying (attempt {} of {})",
                        game_id,
                        attempt + 1,
                        MAX_COMMIT_ATTEMPTS
                    );
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn try_join(
        &self,
        game_id: &str,
        color: Color,
    ) -> Result<JoinOutcome, GameSessionServiceError> {
        let game_session = self.load_session(game_id).await?;

        let mut update = GameStateUpdate::default();
        if !game_session.is_ended() {
            if !game_session.has_joined(color) {
                update = GameStateUpdate::joined(color);
            }
            if game_session.status == GameStatus::Waiting && game_session.has_joined(color.opposite())
            {
                update.status = Some(GameStatus::Active);
            }
        }

        let activated = update.status == Some(GameStatus::Active);
        let game_session = if update.is_empty() {
            game_session
        } else {
            self.write_state(&game_session, &update).await?
        };

        if activated {
            info!("Game {} is now active", game_id);
        }
        let moves = self.repository.list_moves(game_id).await?;

        Ok(JoinOutcome {
            color,
            snapshot: snapshot_with_last_move(&game_session, &moves).for_player(color),
            activated,
        })
    }

    async fn try_activate(&self, game_id: &str) -> Result<GameSession, GameSessionServiceError> {
        let game_session = self.load_session(game_id).await?;
        if game_session.status != GameStatus::Waiting {
            return Ok(game_session);
        }
        let update = GameStateUpdate {
            status: Some(GameStatus::Active),
            ..Default::default()
        };
        self.write_state(&game_session, &update).await
    }

    async fn try_apply_move(
        &self,
        request: &MoveRequest,
        color: Color,
    ) -> Result<ActionOutcome, GameSessionServiceError> {
        let game_session = self.load_session(&request.game_id).await?;
        let (position, applied, ply) = self.play(&game_session, request, color).await?;

        let terminal = detect_game_end(position.as_ref(), color);
        let mut update = match &terminal {
            Some(notice) => GameStateUpdate::ended(notice.result, notice.reason),
            None => GameStateUpdate {
                status: Some(GameStatus::Active),
                ..Default::default()
            },
        };
        update.position = Some(applied.position.clone());
        update.turn = Some(applied.turn);
        update.record = Some(position.export_record());

        let record = MoveRecord {
            game_id: request.game_id.clone(),
            ply,
            from: request.from.clone(),
            to: request.to.clone(),
            promotion: applied.promotion.clone(),
            san: applied.san.clone(),
            position_after: applied.position.clone(),
            created_at: Utc::now(),
        };

        let committed = self
            .repository
            .commit_move(&game_session, &update, &record)
            .await?;

        info!(
            "Applied {} in game {} (ply {})",
            applied.san, request.game_id, ply
        );
        if let Some(notice) = &terminal {
            info!(
                "Game {} ended: {:?} by {:?}",
                request.game_id, notice.result, notice.reason
            );
        }

        Ok(ActionOutcome {
            actor: color,
            snapshot: Snapshot::of(&committed).with_last_move(LastMove {
                from: record.from,
                to: record.to,
                san: record.san,
            }),
            terminal,
        })
    }

    /// Checks shared by `apply_move` and `validate_move`: game still running,
    /// player on turn, move well formed and legal. Returns the position after
    /// the move together with the ply the move will be stored under.
    async fn play(
        &self,
        game_session: &GameSession,
        request: &MoveRequest,
        color: Color,
    ) -> Result<(Box<dyn GamePosition>, AppliedMove, u32), GameSessionServiceError> {
        if game_session.is_ended() {
            return Err(GameSessionServiceError::GameEnded);
        }
        if game_session.turn != color {
            return Err(GameSessionServiceError::NotYourTurn);
        }
        if !request.is_well_formed() {
            return Err(GameSessionServiceError::InvalidMoveFormat);
        }

        let moves = self.repository.list_moves(&game_session.id).await?;
        let history = PositionHistory::from_records(&moves);
        let mut position = self
            .rules_engine
            .load(&game_session.position, &history)?;

        let applied = position.attempt(&request.from, &request.to, request.promotion.as_deref())?;

        Ok((position, applied, moves.len() as u32))
    }

    async fn try_end(
        &self,
        game_id: &str,
        color: Color,
        result: GameResult,
        reason: EndReason,
    ) -> Result<ActionOutcome, GameSessionServiceError> {
        let game_session = self.load_session(game_id).await?;
        if game_session.is_ended() {
            return Err(GameSessionServiceError::GameEnded);
        }

        let committed = self
            .write_state(&game_session, &GameStateUpdate::ended(result, reason))
            .await?;
        info!("Game {} ended: {:?} by {:?}", game_id, result, reason);

        Ok(ActionOutcome {
            actor: color,
            snapshot: Snapshot::of(&committed),
            terminal: Some(TerminalNotice { result, reason }),
        })
    }
}

/// Decides whether the position reached by `mover`'s move ends the game.
/// The first matching condition wins.
pub fn detect_game_end(position: &dyn GamePosition, mover: Color) -> Option<TerminalNotice> {
    let (result, reason) = if position.is_checkmate() {
        (mover.win(), EndReason::Checkmate)
    } else if position.is_stalemate() {
        (GameResult::Draw, EndReason::Stalemate)
    } else if position.is_threefold_repetition()
        || position.is_insufficient_material()
        || position.is_draw()
    {
        // Automatic draws are reported the same way as agreed ones
        (GameResult::Draw, EndReason::DrawAgreement)
    } else {
        return None;
    };

    Some(TerminalNotice { result, reason })
}

fn snapshot_with_last_move(game_session: &GameSession, moves: &[MoveRecord]) -> Snapshot {
    let snapshot = Snapshot::of(game_session);
    match moves.last() {
        Some(last) => snapshot.with_last_move(LastMove {
            from: last.from.clone(),
            to: last.to.clone(),
            san: last.san.clone(),
        }),
        None => snapshot,
    }
}
