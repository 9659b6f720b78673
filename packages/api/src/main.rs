use lambda_http::{run, tracing, Error};
use std::env::set_var;
use std::sync::Arc;

use api::state::AppState;
use shared::config::{ApiSettings, StorageSettings};
use shared::repositories::game_repository::DynamoDbGameSessionRepository;
use shared::services::game_session_service::GameSessionService;
use shared::services::rules_engine::ChessRulesEngine;

#[tokio::main]
async fn main() -> Result<(), Error> {
    set_var("AWS_LAMBDA_HTTP_IGNORE_STAGE_IN_PATH", "true");

    // required to enable CloudWatch error logging by the runtime
    tracing::init_default_subscriber();

    let storage = StorageSettings::from_env()?;
    let settings = ApiSettings::from_env();

    let config = aws_config::load_from_env().await;
    let client = aws_sdk_dynamodb::Client::new(&config);

    let repository = Arc::new(DynamoDbGameSessionRepository::new(client, &storage));
    let game_session_service = Arc::new(GameSessionService::new(
        repository,
        Arc::new(ChessRulesEngine::new()),
    ));

    let app_state = AppState {
        game_session_service,
        settings: Arc::new(settings),
    };

    run(api::router(app_state)).await
}
