//! Addressing of orchestrator outcomes: which events go to the whole session
//! and which only to the player who acted.

use crate::{
    models::events::{
        DrawOfferNotice, OutboundEvent, PresenceNotice, Rejection, SessionEvent, Snapshot,
    },
    models::move_request::MoveRequest,
    services::{
        errors::game_session_service_errors::GameSessionServiceError,
        game_session_service::{ActionOutcome, DrawOutcome, JoinOutcome},
    },
};

impl ActionOutcome {
    /// New state for everyone, then the terminal notice if the game just ended.
    pub fn events(&self) -> Vec<OutboundEvent> {
        let mut events = vec![OutboundEvent::broadcast(SessionEvent::GameState(
            self.snapshot.clone(),
        ))];
        if let Some(notice) = &self.terminal {
            events.push(OutboundEvent::broadcast(SessionEvent::GameEnded(
                notice.clone(),
            )));
        }
        events
    }
}

impl JoinOutcome {
    pub fn events(&self) -> Vec<OutboundEvent> {
        let mut events = vec![
            OutboundEvent::unicast(SessionEvent::GameState(self.snapshot.clone())),
            OutboundEvent::broadcast(SessionEvent::PlayerJoined(PresenceNotice {
                player_color: self.color,
            })),
        ];
        if self.activated {
            // The opponent learns the game is live; the joiner already has it
            let mut shared = self.snapshot.clone();
            shared.player_color = None;
            events.push(OutboundEvent::broadcast(SessionEvent::GameState(shared)));
        }
        events
    }
}

impl DrawOutcome {
    pub fn events(&self) -> Vec<OutboundEvent> {
        match self {
            DrawOutcome::Offered { by } => vec![OutboundEvent::broadcast(
                SessionEvent::DrawOffered(DrawOfferNotice { offered_by: *by }),
            )],
            DrawOutcome::Agreed(outcome) => outcome.events(),
        }
    }
}

/// State sent back to a single client that asked to resynchronise.
pub fn sync_events(snapshot: Snapshot) -> Vec<OutboundEvent> {
    vec![OutboundEvent::unicast(SessionEvent::GameState(snapshot))]
}

/// Rejection for the acting player only. Moves echo the attempted squares.
pub fn rejection(
    error: &GameSessionServiceError,
    attempted: Option<&MoveRequest>,
) -> OutboundEvent {
    OutboundEvent::unicast(SessionEvent::Rejected(Rejection {
        reason: error.reason().to_string(),
        message: error.message().to_string(),
        from: attempted.map(|request| request.from.clone()),
        to: attempted.map(|request| request.to.clone()),
    }))
}
