//! Integration tests for the games REST surface.
//!
//! Requests go through the full axum router with the in-memory repository
//! standing in for DynamoDB.

use axum::{
    body::Body,
    http::{Request, Response, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use api::state::AppState;
use shared::{
    config::ApiSettings,
    models::{
        game_session::{Color, GameSession},
        move_request::MoveRequest,
    },
    repositories::in_memory_game_repository::InMemoryGameSessionRepository,
    services::{game_session_service::GameSessionService, rules_engine::ChessRulesEngine},
};

fn test_app() -> (Router, Arc<GameSessionService>) {
    let service = Arc::new(GameSessionService::new(
        Arc::new(InMemoryGameSessionRepository::new()),
        Arc::new(ChessRulesEngine::new()),
    ));
    let settings = ApiSettings::from_lookup(|name| match name {
        "PUBLIC_BASE_URL" => Some("https://chess.example/".to_string()),
        _ => None,
    });
    let state = AppState {
        game_session_service: service.clone(),
        settings: Arc::new(settings),
    };
    (api::router(state), service)
}

async fn body_json(response: Response<Body>) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn validate(game_id: &str, credential: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(format!("/games/{}/moves/validate", game_id))
        .header("content-type", "application/json");
    if let Some(credential) = credential {
        builder = builder.header("Authorization", format!("Bearer {}", credential));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn new_game(service: &GameSessionService) -> GameSession {
    service.create_game().await.unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let (app, _) = test_app();

    let response = app.oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_create_game_returns_join_links() {
    let (app, service) = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/games")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    let game_id = body["game_id"].as_str().unwrap();
    let game = service.get_game(game_id).await.unwrap();
    assert_eq!(
        body["white_url"],
        format!(
            "https://chess.example/g/{}?token={}",
            game_id, game.white_credential
        )
    );
    assert_eq!(
        body["black_url"],
        format!(
            "https://chess.example/g/{}?token={}",
            game_id, game.black_credential
        )
    );
}

#[tokio::test]
async fn test_get_game_hides_credentials() {
    let (app, service) = test_app();
    let game = new_game(&service).await;

    let response = app
        .oneshot(get(&format!("/games/{}", game.id)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["id"], game.id.as_str());
    assert_eq!(body["status"], "waiting");
    assert_eq!(body["turn"], "white");
    assert_eq!(body["result"], "unknown");
    let text = body.to_string();
    assert!(!text.contains(&game.white_credential));
    assert!(!text.contains(&game.black_credential));
}

#[tokio::test]
async fn test_get_game_rejects_malformed_id() {
    let (app, _) = test_app();

    let response = app.oneshot(get("/games/not-a-uuid")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Invalid game ID format");
}

#[tokio::test]
async fn test_get_unknown_game() {
    let (app, _) = test_app();

    let response = app
        .oneshot(get("/games/6f1c2b4e-9d1a-4b43-8a55-2f6d0e7c9a10"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["reason"], "game_not_found");
}

#[tokio::test]
async fn test_list_moves_in_order() {
    let (app, service) = test_app();
    let game = new_game(&service).await;
    for (credential, from, to) in [
        (&game.white_credential, "e2", "e4"),
        (&game.black_credential, "e7", "e5"),
    ] {
        service
            .apply_move(&MoveRequest::new(&game.id, credential, from, to))
            .await
            .unwrap();
    }

    let response = app
        .oneshot(get(&format!("/games/{}/moves", game.id)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let moves = body["moves"].as_array().unwrap();
    assert_eq!(moves.len(), 2);
    assert_eq!(moves[0]["san"], "e4");
    assert_eq!(moves[0]["ply"], 0);
    assert_eq!(moves[1]["san"], "e5");
}

#[tokio::test]
async fn test_validate_legal_move_does_not_persist() {
    let (app, service) = test_app();
    let game = new_game(&service).await;

    let response = app
        .oneshot(validate(
            &game.id,
            Some(&game.white_credential),
            json!({"from": "e2", "to": "e4"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({"valid": true, "san": "e4"})
    );
    assert!(service.list_moves(&game.id).await.unwrap().is_empty());
    assert_eq!(service.get_game(&game.id).await.unwrap().turn, Color::White);
}

#[tokio::test]
async fn test_validate_requires_bearer_credential() {
    let (app, service) = test_app();
    let game = new_game(&service).await;

    let response = app
        .oneshot(validate(&game.id, None, json!({"from": "e2", "to": "e4"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_validate_rejections() {
    let (app, service) = test_app();
    let game = new_game(&service).await;

    let cases = [
        (
            Some("not-a-credential"),
            json!({"from": "e2", "to": "e4"}),
            StatusCode::UNAUTHORIZED,
            "invalid_token",
        ),
        (
            Some(game.black_credential.as_str()),
            json!({"from": "e7", "to": "e5"}),
            StatusCode::CONFLICT,
            "not_your_turn",
        ),
        (
            Some(game.white_credential.as_str()),
            json!({"from": "e2", "to": "e5"}),
            StatusCode::BAD_REQUEST,
            "invalid_move_format",
        ),
        (
            Some(game.white_credential.as_str()),
            json!({"from": "z9", "to": "e4"}),
            StatusCode::BAD_REQUEST,
            "invalid_move_format",
        ),
    ];

    for (credential, body, status, reason) in cases {
        let response = app
            .clone()
            .oneshot(validate(&game.id, credential, body))
            .await
            .unwrap();

        assert_eq!(response.status(), status);
        assert_eq!(body_json(response).await["reason"], reason);
    }
}

#[tokio::test]
async fn test_validate_on_ended_game() {
    let (app, service) = test_app();
    let game = new_game(&service).await;
    service
        .resign(&game.id, &game.black_credential)
        .await
        .unwrap();

    let response = app
        .oneshot(validate(
            &game.id,
            Some(&game.white_credential),
            json!({"from": "e2", "to": "e4"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["reason"], "game_ended");
}
