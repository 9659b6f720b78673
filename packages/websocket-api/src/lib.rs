use lambda_runtime::Error;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error};

pub mod actions;
pub mod messages;
pub mod state;

use state::AppState;

#[derive(Debug, Deserialize)]
pub struct WebSocketEvent {
    #[serde(rename = "requestContext")]
    pub request_context: RequestContext,
    pub body: Option<String>,
    #[serde(rename = "queryStringParameters")]
    pub query_string_parameters: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct RequestContext {
    #[serde(rename = "connectionId")]
    pub connection_id: String,
    #[serde(rename = "routeKey")]
    pub route_key: String,
    #[serde(rename = "eventType")]
    pub event_type: Option<String>,
    #[serde(rename = "domainName")]
    pub domain_name: Option<String>,
    pub stage: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WebSocketResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: Option<String>,
    #[serde(rename = "headers", skip_serializing_if = "Option::is_none")]
    pub headers: Option<serde_json::Value>,
}

impl WebSocketResponse {
    pub fn ok() -> Self {
        WebSocketResponse {
            status_code: 200,
            body: None,
            headers: None,
        }
    }

    pub fn error(status_code: u16, message: &str) -> Self {
        WebSocketResponse {
            status_code,
            body: Some(json!({ "error": message }).to_string()),
            headers: None,
        }
    }
}

pub async fn websocket_handler(
    event: WebSocketEvent,
    state: AppState,
) -> Result<WebSocketResponse, Error> {
    let route_key = event.request_context.route_key.as_str();
    let connection_id = event.request_context.connection_id.as_str();

    debug!(
        "Processing route_key: {}, connection_id: {}",
        route_key, connection_id
    );

    match route_key {
        "$connect" => actions::connect::handle_connect(connection_id, &state).await,
        "$disconnect" => actions::disconnect::handle_disconnect(connection_id, &state).await,
        "$default" => actions::default::handle_default_message(&event, &state).await,
        _ => {
            error!("Unknown route key: {}", route_key);
            Ok(WebSocketResponse::error(400, "Unknown route"))
        }
    }
}
