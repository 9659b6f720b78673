//! Drives the WebSocket handler end to end with in-memory storage and a
//! connection registry that records every pushed frame.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use shared::{
    models::{
        connection::PlayerConnection,
        game_session::{GameSession, GameStatus},
    },
    repositories::{
        connection_repository::ConnectionRepository,
        errors::connection_repository_errors::ConnectionRepositoryError,
        in_memory_connection_repository::InMemoryConnectionRepository,
        in_memory_game_repository::InMemoryGameSessionRepository,
    },
    services::{
        game_session_service::GameSessionService, rules_engine::ChessRulesEngine,
        websocket_service::WebSocketService,
    },
};
use websocket_api::{state::AppState, websocket_handler, RequestContext, WebSocketEvent};

struct Harness {
    state: AppState,
    connections: Arc<InMemoryConnectionRepository>,
    game: GameSession,
}

/// Registry whose next push stalls, as a slow API Gateway call would.
struct SlowRegistry {
    inner: Arc<InMemoryConnectionRepository>,
    delay_next_send: AtomicBool,
}

#[async_trait]
impl ConnectionRepository for SlowRegistry {
    async fn store_connection(
        &self,
        connection: &PlayerConnection,
    ) -> Result<(), ConnectionRepositoryError> {
        self.inner.store_connection(connection).await
    }

    async fn get_connection(
        &self,
        connection_id: &str,
    ) -> Result<Option<PlayerConnection>, ConnectionRepositoryError> {
        self.inner.get_connection(connection_id).await
    }

    async fn remove_connection(
        &self,
        connection_id: &str,
    ) -> Result<(), ConnectionRepositoryError> {
        self.inner.remove_connection(connection_id).await
    }

    async fn connections_for_game(
        &self,
        game_id: &str,
    ) -> Result<Vec<PlayerConnection>, ConnectionRepositoryError> {
        self.inner.connections_for_game(game_id).await
    }

    async fn send_message(
        &self,
        connection_id: &str,
        message: &str,
    ) -> Result<(), ConnectionRepositoryError> {
        if self.delay_next_send.swap(false, Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        self.inner.send_message(connection_id, message).await
    }
}

impl Harness {
    async fn new() -> Self {
        let connections = Arc::new(InMemoryConnectionRepository::new());
        Self::with_registry(connections.clone(), connections).await
    }

    /// `connections` records the frames; `registry` is what the handler talks to.
    async fn with_registry(
        connections: Arc<InMemoryConnectionRepository>,
        registry: Arc<dyn ConnectionRepository>,
    ) -> Self {
        let game_session_service = Arc::new(GameSessionService::new(
            Arc::new(InMemoryGameSessionRepository::new()),
            Arc::new(ChessRulesEngine::new()),
        ));
        let game = game_session_service.create_game().await.unwrap();
        let state = AppState {
            websocket_service: Arc::new(WebSocketService::new(registry)),
            game_session_service,
        };
        Harness {
            state,
            connections,
            game,
        }
    }

    async fn send(&self, route_key: &str, connection_id: &str, body: Option<Value>) -> u16 {
        let event = WebSocketEvent {
            request_context: RequestContext {
                connection_id: connection_id.to_string(),
                route_key: route_key.to_string(),
                event_type: None,
                domain_name: None,
                stage: None,
            },
            body: body.map(|body| body.to_string()),
            query_string_parameters: None,
        };
        websocket_handler(event, self.state.clone())
            .await
            .unwrap()
            .status_code
    }

    async fn action(&self, connection_id: &str, body: Value) -> u16 {
        self.send("$default", connection_id, Some(body)).await
    }

    /// Connects and joins both players; white on "white-conn", black on "black-conn".
    async fn seat_both(&self) {
        for (connection_id, credential) in [
            ("white-conn", &self.game.white_credential),
            ("black-conn", &self.game.black_credential),
        ] {
            assert_eq!(self.send("$connect", connection_id, None).await, 200);
            let status = self
                .action(
                    connection_id,
                    json!({"action": "join_game", "game_id": self.game.id, "credential": credential}),
                )
                .await;
            assert_eq!(status, 200);
        }
    }

    fn frames(&self, connection_id: &str) -> Vec<Value> {
        self.connections
            .messages_for(connection_id)
            .iter()
            .map(|message| serde_json::from_str(message).unwrap())
            .collect()
    }

    fn last_frame(&self, connection_id: &str) -> Value {
        self.frames(connection_id).pop().unwrap()
    }
}

#[tokio::test]
async fn test_connect_and_disconnect() {
    let harness = Harness::new().await;

    assert_eq!(harness.send("$connect", "conn-1", None).await, 200);
    assert!(harness
        .connections
        .get_connection("conn-1")
        .await
        .unwrap()
        .is_some());

    assert_eq!(harness.send("$disconnect", "conn-1", None).await, 200);
    assert!(harness
        .connections
        .get_connection("conn-1")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_unknown_route() {
    let harness = Harness::new().await;

    assert_eq!(harness.send("$other", "conn-1", None).await, 400);
}

#[tokio::test]
async fn test_joining_activates_and_notifies_opponent() {
    let harness = Harness::new().await;

    harness.seat_both().await;

    let black = harness.frames("black-conn");
    assert_eq!(black[0]["event"], "game_state");
    assert_eq!(black[0]["data"]["player_color"], "black");
    assert_eq!(black[0]["data"]["status"], "active");

    let white = harness.frames("white-conn");
    assert_eq!(white[0]["data"]["player_color"], "white");
    assert_eq!(white[0]["data"]["status"], "waiting");
    let events: Vec<&str> = white
        .iter()
        .map(|frame| frame["event"].as_str().unwrap())
        .collect();
    assert!(events.contains(&"player_joined"));
    let last = white.last().unwrap();
    assert_eq!(last["event"], "game_state");
    assert_eq!(last["data"]["status"], "active");
    assert!(last["data"].get("player_color").is_none());

    let attached = harness
        .connections
        .connections_for_game(&harness.game.id)
        .await
        .unwrap();
    assert_eq!(attached.len(), 2);
}

#[tokio::test]
async fn test_join_with_bad_credential_is_rejected() {
    let harness = Harness::new().await;
    harness.send("$connect", "conn-1", None).await;

    harness
        .action(
            "conn-1",
            json!({"action": "join_game", "game_id": harness.game.id, "credential": "nope"}),
        )
        .await;

    let frame = harness.last_frame("conn-1");
    assert_eq!(frame["event"], "rejected");
    assert_eq!(frame["data"]["reason"], "invalid_token");
    let stored = harness
        .connections
        .get_connection("conn-1")
        .await
        .unwrap()
        .unwrap();
    assert!(stored.game_id.is_none());
}

#[tokio::test]
async fn test_move_is_broadcast_to_both_players() {
    let harness = Harness::new().await;
    harness.seat_both().await;

    harness
        .action(
            "white-conn",
            json!({"action": "make_move", "game_id": harness.game.id, "credential": harness.game.white_credential, "from": "e2", "to": "e4"}),
        )
        .await;

    for connection_id in ["white-conn", "black-conn"] {
        let frame = harness.last_frame(connection_id);
        assert_eq!(frame["event"], "game_state");
        assert_eq!(frame["data"]["turn"], "black");
        assert_eq!(frame["data"]["last_move"]["san"], "e4");
    }
}

#[tokio::test]
async fn test_broadcasts_follow_commit_order() {
    let connections = Arc::new(InMemoryConnectionRepository::new());
    let registry = Arc::new(SlowRegistry {
        inner: connections.clone(),
        delay_next_send: AtomicBool::new(false),
    });
    let harness = Harness::with_registry(connections, registry.clone()).await;
    harness.seat_both().await;
    registry.delay_next_send.store(true, Ordering::SeqCst);

    let white = harness.action(
        "white-conn",
        json!({"action": "make_move", "game_id": harness.game.id, "credential": harness.game.white_credential, "from": "e2", "to": "e4"}),
    );
    let black = async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        harness
            .action(
                "black-conn",
                json!({"action": "make_move", "game_id": harness.game.id, "credential": harness.game.black_credential, "from": "e7", "to": "e5"}),
            )
            .await
    };
    let (white_status, black_status) = tokio::join!(white, black);
    assert_eq!((white_status, black_status), (200, 200));

    for connection_id in ["white-conn", "black-conn"] {
        let moves: Vec<Value> = harness
            .frames(connection_id)
            .into_iter()
            .filter(|frame| frame["event"] == "game_state" && frame["data"].get("last_move").is_some())
            .collect();
        let sans: Vec<&str> = moves
            .iter()
            .map(|frame| frame["data"]["last_move"]["san"].as_str().unwrap())
            .collect();
        assert_eq!(sans, vec!["e4", "e5"]);
        assert!(moves[0]["data"]["version"].as_u64() < moves[1]["data"]["version"].as_u64());
    }
}

#[tokio::test]
async fn test_out_of_turn_move_only_reaches_mover() {
    let harness = Harness::new().await;
    harness.seat_both().await;
    let white_before = harness.frames("white-conn").len();

    harness
        .action(
            "black-conn",
            json!({"action": "make_move", "game_id": harness.game.id, "credential": harness.game.black_credential, "from": "e7", "to": "e5"}),
        )
        .await;

    let frame = harness.last_frame("black-conn");
    assert_eq!(frame["event"], "rejected");
    assert_eq!(frame["data"]["reason"], "not_your_turn");
    assert_eq!(frame["data"]["from"], "e7");
    assert_eq!(frame["data"]["to"], "e5");
    assert_eq!(harness.frames("white-conn").len(), white_before);
}

#[tokio::test]
async fn test_resignation_ends_game_for_everyone() {
    let harness = Harness::new().await;
    harness.seat_both().await;

    harness
        .action(
            "black-conn",
            json!({"action": "resign", "game_id": harness.game.id, "credential": harness.game.black_credential}),
        )
        .await;

    for connection_id in ["white-conn", "black-conn"] {
        let frames = harness.frames(connection_id);
        let state = &frames[frames.len() - 2];
        assert_eq!(state["event"], "game_state");
        assert_eq!(state["data"]["status"], "ended");
        assert_eq!(
            frames[frames.len() - 1],
            json!({"event": "game_ended", "data": {"result": "white_win", "reason": "resignation"}})
        );
    }

    let game = harness
        .state
        .game_session_service
        .get_game(&harness.game.id)
        .await
        .unwrap();
    assert_eq!(game.status, GameStatus::Ended);
}

#[tokio::test]
async fn test_draw_offer_and_acceptance() {
    let harness = Harness::new().await;
    harness.seat_both().await;

    harness
        .action(
            "white-conn",
            json!({"action": "offer_draw", "game_id": harness.game.id, "credential": harness.game.white_credential}),
        )
        .await;
    assert_eq!(
        harness.last_frame("black-conn"),
        json!({"event": "draw_offered", "data": {"offered_by": "white"}})
    );

    harness
        .action(
            "black-conn",
            json!({"action": "accept_draw", "game_id": harness.game.id, "credential": harness.game.black_credential}),
        )
        .await;
    assert_eq!(
        harness.last_frame("white-conn"),
        json!({"event": "game_ended", "data": {"result": "draw", "reason": "draw_agreement"}})
    );
}

#[tokio::test]
async fn test_sync_state_reattaches_reconnected_client() {
    let harness = Harness::new().await;
    harness.seat_both().await;
    harness.send("$disconnect", "black-conn", None).await;
    harness.send("$connect", "black-conn-2", None).await;

    harness
        .action(
            "black-conn-2",
            json!({"action": "sync_state", "gameId": harness.game.id, "token": harness.game.black_credential}),
        )
        .await;

    let frame = harness.last_frame("black-conn-2");
    assert_eq!(frame["event"], "game_state");
    assert_eq!(frame["data"]["player_color"], "black");
    let attached = harness
        .connections
        .get_connection("black-conn-2")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(attached.game_id.as_deref(), Some(harness.game.id.as_str()));
}

#[tokio::test]
async fn test_ping_and_malformed_frames() {
    let harness = Harness::new().await;
    harness.send("$connect", "conn-1", None).await;

    harness.action("conn-1", json!({"action": "ping"})).await;
    assert_eq!(harness.last_frame("conn-1")["action"], "pong");

    harness.action("conn-1", json!({"action": "echo"})).await;
    let frame = harness.last_frame("conn-1");
    assert_eq!(frame["action"], "error");
    assert_eq!(frame["message"], "Unknown action");

    harness.send("$default", "conn-1", None).await;
    assert_eq!(harness.last_frame("conn-1")["message"], "No message body");
}
