use std::sync::Arc;
use tracing::{error, info, warn};

use crate::{
    models::{
        connection::PlayerConnection,
        events::{Audience, OutboundEvent},
        game_session::Color,
    },
    repositories::{
        connection_repository::ConnectionRepository,
        errors::connection_repository_errors::ConnectionRepositoryError,
    },
};

#[derive(Clone)]
pub struct WebSocketService {
    repository: Arc<dyn ConnectionRepository>,
}

impl WebSocketService {
    pub fn new(repository: Arc<dyn ConnectionRepository>) -> Self {
        Self { repository }
    }

    pub async fn connect(&self, connection_id: &str) -> Result<(), ConnectionRepositoryError> {
        info!("Storing WebSocket connection: {}", connection_id);
        self.repository
            .store_connection(&PlayerConnection::new(connection_id))
            .await
    }

    pub async fn disconnect(&self, connection_id: &str) -> Result<(), ConnectionRepositoryError> {
        info!("Removing WebSocket connection: {}", connection_id);
        self.repository.remove_connection(connection_id).await
    }

    /// Binds the connection to a game so it receives that session's broadcasts.
    pub async fn attach(
        &self,
        connection_id: &str,
        game_id: &str,
        color: Color,
    ) -> Result<(), ConnectionRepositoryError> {
        info!(
            "Attaching connection {} to game {} as {}",
            connection_id, game_id, color
        );
        self.repository
            .store_connection(&PlayerConnection::joined(connection_id, game_id, color))
            .await
    }

    /// Sends each event to its audience, in order. Connections that turn out
    /// to be gone are dropped from the registry and skipped.
    pub async fn deliver(
        &self,
        game_id: &str,
        actor_connection_id: &str,
        events: &[OutboundEvent],
    ) -> Result<(), ConnectionRepositoryError> {
        let mut session_connections: Option<Vec<String>> = None;

        for outbound in events {
            let message = serde_json::to_string(&outbound.event)
                .map_err(|e| ConnectionRepositoryError::Serialization(e.to_string()))?;

            let recipients = match outbound.audience {
                Audience::Actor => vec![actor_connection_id.to_string()],
                Audience::Session => {
                    if session_connections.is_none() {
                        let connections = self.repository.connections_for_game(game_id).await?;
                        session_connections = Some(
                            connections
                                .into_iter()
                                .map(|connection| connection.connection_id)
                                .collect(),
                        );
                    }
                    session_connections.clone().unwrap_or_default()
                }
            };

            for connection_id in recipients {
                if !self.send(&connection_id, &message).await? {
                    if let Some(connections) = session_connections.as_mut() {
                        connections.retain(|id| id != &connection_id);
                    }
                }
            }
        }

        Ok(())
    }

    /// Pushes a raw frame to a single connection.
    pub async fn reply(
        &self,
        connection_id: &str,
        message: &str,
    ) -> Result<(), ConnectionRepositoryError> {
        self.send(connection_id, message).await.map(|_| ())
    }

    /// Returns `false` when the connection was gone and has been pruned.
    /// Any other failure is returned to the caller.
    async fn send(
        &self,
        connection_id: &str,
        message: &str,
    ) -> Result<bool, ConnectionRepositoryError> {
        match self.repository.send_message(connection_id, message).await {
            Ok(()) => Ok(true),
            Err(ConnectionRepositoryError::Gone) => {
                warn!("Connection {} is gone, removing it", connection_id);
                self.repository.remove_connection(connection_id).await?;
                Ok(false)
            }
            Err(e) => {
                error!("Failed to send message to {}: {}", connection_id, e);
                Err(e)
            }
        }
    }
}
