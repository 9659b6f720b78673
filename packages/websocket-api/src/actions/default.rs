use lambda_runtime::Error;
use shared::models::move_request::DrawAction;
use tracing::{debug, warn};

use super::{draw, join_game, make_move, reply, resign, sync_state};
use crate::{
    messages::{ClientMessage, ControlFrame},
    state::AppState,
    WebSocketEvent, WebSocketResponse,
};

pub async fn handle_default_message(
    event: &WebSocketEvent,
    state: &AppState,
) -> Result<WebSocketResponse, Error> {
    let connection_id = event.request_context.connection_id.as_str();

    let Some(body) = &event.body else {
        debug!("No body found in WebSocket event");
        return reply(state, connection_id, &ControlFrame::error("No message body")).await;
    };

    let message = match ClientMessage::parse(body) {
        Ok(message) => message,
        Err(e) => {
            warn!("Failed to parse message from {}: {:?}", connection_id, e);
            return reply(state, connection_id, &ControlFrame::error(e.to_string())).await;
        }
    };
    debug!("Received {:?} from {}", message_kind(&message), connection_id);

    match message {
        ClientMessage::JoinGame(request) => {
            join_game::handle_join_game(connection_id, request, state).await
        }
        ClientMessage::MakeMove(request) => {
            make_move::handle_make_move(connection_id, request.into(), state).await
        }
        ClientMessage::Resign(request) => resign::handle_resign(connection_id, request, state).await,
        ClientMessage::OfferDraw(request) => {
            draw::handle_draw(connection_id, request, DrawAction::Offer, state).await
        }
        ClientMessage::AcceptDraw(request) => {
            draw::handle_draw(connection_id, request, DrawAction::Accept, state).await
        }
        ClientMessage::SyncState(request) => {
            sync_state::handle_sync_state(connection_id, request, state).await
        }
        ClientMessage::Ping => reply(state, connection_id, &ControlFrame::pong()).await,
    }
}

// Credentials stay out of the logs
fn message_kind(message: &ClientMessage) -> &'static str {
    match message {
        ClientMessage::JoinGame(_) => "join_game",
        ClientMessage::MakeMove(_) => "make_move",
        ClientMessage::Resign(_) => "resign",
        ClientMessage::OfferDraw(_) => "offer_draw",
        ClientMessage::AcceptDraw(_) => "accept_draw",
        ClientMessage::SyncState(_) => "sync_state",
        ClientMessage::Ping => "ping",
    }
}
