use async_trait::async_trait;
use aws_sdk_apigatewaymanagement::error::SdkError as ApiGatewaySdkError;
use aws_sdk_apigatewaymanagement::{primitives::Blob, Client as ApiGatewayClient};
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use serde_dynamo::{from_item, to_item};
use tracing::{debug, info};

use crate::config::WebSocketSettings;
use crate::models::connection::PlayerConnection;
use crate::repositories::errors::connection_repository_errors::ConnectionRepositoryError;

#[cfg(test)]
use mockall::automock;

/// Registry of live WebSocket connections and the channel used to push to them.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ConnectionRepository: Send + Sync {
    /// Inserts or replaces the registry row for the connection.
    async fn store_connection(
        &self,
        connection: &PlayerConnection,
    ) -> Result<(), ConnectionRepositoryError>;

    async fn get_connection(
        &self,
        connection_id: &str,
    ) -> Result<Option<PlayerConnection>, ConnectionRepositoryError>;

    async fn remove_connection(&self, connection_id: &str)
        -> Result<(), ConnectionRepositoryError>;

    async fn connections_for_game(
        &self,
        game_id: &str,
    ) -> Result<Vec<PlayerConnection>, ConnectionRepositoryError>;

    /// Fails with [`ConnectionRepositoryError::Gone`] when the client has disconnected.
    async fn send_message(
        &self,
        connection_id: &str,
        message: &str,
    ) -> Result<(), ConnectionRepositoryError>;
}

pub struct DynamoDbConnectionRepository {
    dynamodb_client: DynamoDbClient,
    api_gateway_client: ApiGatewayClient,
    table_name: String,
    game_index: String,
}

impl DynamoDbConnectionRepository {
    pub fn new(
        dynamodb_client: DynamoDbClient,
        api_gateway_client: ApiGatewayClient,
        settings: &WebSocketSettings,
    ) -> Self {
        Self {
            dynamodb_client,
            api_gateway_client,
            table_name: settings.connections_table.clone(),
            game_index: settings.connections_game_index.clone(),
        }
    }

    /// Management API client pointed at the WebSocket stage.
    pub fn management_client(
        config: &aws_config::SdkConfig,
        settings: &WebSocketSettings,
    ) -> ApiGatewayClient {
        let api_gateway_config = aws_sdk_apigatewaymanagement::config::Builder::from(config)
            .endpoint_url(&settings.api_endpoint)
            .build();
        ApiGatewayClient::from_conf(api_gateway_config)
    }
}

#[async_trait]
impl ConnectionRepository for DynamoDbConnectionRepository {
    async fn store_connection(
        &self,
        connection: &PlayerConnection,
    ) -> Result<(), ConnectionRepositoryError> {
        let item = to_item(connection)
            .map_err(|e| ConnectionRepositoryError::Serialization(e.to_string()))?;

        self.dynamodb_client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|e| ConnectionRepositoryError::DynamoDb(e.to_string()))?;

        info!("Stored WebSocket connection: {}", connection.connection_id);
        Ok(())
    }

    async fn get_connection(
        &self,
        connection_id: &str,
    ) -> Result<Option<PlayerConnection>, ConnectionRepositoryError> {
        let result = self
            .dynamodb_client
            .get_item()
            .table_name(&self.table_name)
            .key("connection_id", AttributeValue::S(connection_id.to_string()))
            .send()
            .await
            .map_err(|e| ConnectionRepositoryError::DynamoDb(e.to_string()))?;

        match result.item {
            Some(item) => {
                let connection: PlayerConnection = from_item(item)
                    .map_err(|e| ConnectionRepositoryError::Serialization(e.to_string()))?;
                Ok(Some(connection))
            }
            None => Ok(None),
        }
    }

    async fn remove_connection(
        &self,
        connection_id: &str,
    ) -> Result<(), ConnectionRepositoryError> {
        self.dynamodb_client
            .delete_item()
            .table_name(&self.table_name)
            .key("connection_id", AttributeValue::S(connection_id.to_string()))
            .send()
            .await
            .map_err(|e| ConnectionRepositoryError::DynamoDb(e.to_string()))?;

        info!("Removed WebSocket connection: {}", connection_id);
        Ok(())
    }

    async fn connections_for_game(
        &self,
        game_id: &str,
    ) -> Result<Vec<PlayerConnection>, ConnectionRepositoryError> {
        let mut connections = Vec::new();
        let mut exclusive_start_key = None;

        loop {
            let output = self
                .dynamodb_client
                .query()
                .table_name(&self.table_name)
                .index_name(&self.game_index)
                .key_condition_expression("game_id = :game_id")
                .expression_attribute_values(":game_id", AttributeValue::S(game_id.to_string()))
                .set_exclusive_start_key(exclusive_start_key)
                .send()
                .await
                .map_err(|e| ConnectionRepositoryError::DynamoDb(e.to_string()))?;

            for item in output.items.unwrap_or_default() {
                let connection: PlayerConnection = from_item(item)
                    .map_err(|e| ConnectionRepositoryError::Serialization(e.to_string()))?;
                connections.push(connection);
            }

            match output.last_evaluated_key {
                Some(key) if !key.is_empty() => exclusive_start_key = Some(key),
                _ => break,
            }
        }

        debug!(
            "Found {} connections for game {}",
            connections.len(),
            game_id
        );
        Ok(connections)
    }

    async fn send_message(
        &self,
        connection_id: &str,
        message: &str,
    ) -> Result<(), ConnectionRepositoryError> {
        let result = self
            .api_gateway_client
            .post_to_connection()
            .connection_id(connection_id)
            .data(Blob::new(message.as_bytes()))
            .send()
            .await;

        match result {
            Ok(_) => {
                debug!("Sent message to connection: {}", connection_id);
                Ok(())
            }
            Err(ApiGatewaySdkError::ServiceError(service_err))
                if service_err.err().is_gone_exception() =>
            {
                Err(ConnectionRepositoryError::Gone)
            }
            Err(e) => Err(ConnectionRepositoryError::ApiGateway(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::game_session::Color;
    use std::collections::HashMap;

    #[test]
    fn test_connection_item_shape() {
        let connection = PlayerConnection::joined("conn-1", "game-1", Color::Black);

        let item: HashMap<String, AttributeValue> = to_item(&connection).unwrap();

        assert_eq!(item["connection_id"], AttributeValue::S("conn-1".to_string()));
        assert_eq!(item["game_id"], AttributeValue::S("game-1".to_string()));
        assert_eq!(item["color"], AttributeValue::S("black".to_string()));

        let restored: PlayerConnection = from_item(item).unwrap();
        assert_eq!(restored, connection);
    }

    #[test]
    fn test_unjoined_connection_has_no_index_key() {
        let connection = PlayerConnection::new("conn-2");

        let item: HashMap<String, AttributeValue> = to_item(&connection).unwrap();

        assert!(!item.contains_key("game_id"));
        assert!(!item.contains_key("color"));
        let restored: PlayerConnection = from_item(item).unwrap();
        assert!(restored.game_id.is_none());
    }
}
