use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use std::sync::Arc;

use shared::config::{StorageSettings, WebSocketSettings};
use shared::repositories::connection_repository::DynamoDbConnectionRepository;
use shared::repositories::game_repository::DynamoDbGameSessionRepository;
use shared::services::game_session_service::GameSessionService;
use shared::services::rules_engine::ChessRulesEngine;
use shared::services::websocket_service::WebSocketService;
use websocket_api::{state::AppState, websocket_handler, WebSocketEvent};

#[tokio::main]
async fn main() -> Result<(), Error> {
    // required to enable CloudWatch error logging by the runtime
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let storage = StorageSettings::from_env()?;
    let websocket_settings = WebSocketSettings::from_env()?;

    // Set up services
    let config = aws_config::load_from_env().await;
    let dynamodb_client = aws_sdk_dynamodb::Client::new(&config);
    let api_gateway_client =
        DynamoDbConnectionRepository::management_client(&config, &websocket_settings);

    let connection_repository = Arc::new(DynamoDbConnectionRepository::new(
        dynamodb_client.clone(),
        api_gateway_client,
        &websocket_settings,
    ));
    let game_repository = Arc::new(DynamoDbGameSessionRepository::new(
        dynamodb_client,
        &storage,
    ));

    let app_state = AppState {
        websocket_service: Arc::new(WebSocketService::new(connection_repository)),
        game_session_service: Arc::new(GameSessionService::new(
            game_repository,
            Arc::new(ChessRulesEngine::new()),
        )),
    };

    run(service_fn(|event: LambdaEvent<WebSocketEvent>| {
        websocket_handler(event.payload, app_state.clone())
    }))
    .await
}
