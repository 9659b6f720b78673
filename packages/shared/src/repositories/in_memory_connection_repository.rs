use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::models::connection::PlayerConnection;
use crate::repositories::connection_repository::ConnectionRepository;
use crate::repositories::errors::connection_repository_errors::ConnectionRepositoryError;

/// Connection registry that keeps everything in memory and records what
/// would have been pushed to each connection.
#[derive(Default)]
pub struct InMemoryConnectionRepository {
    connections: Mutex<HashMap<String, PlayerConnection>>,
    sent: Mutex<Vec<(String, String)>>,
    gone: Mutex<HashSet<String>>,
}

impl InMemoryConnectionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes later sends to the connection fail as if the client had vanished.
    pub fn mark_gone(&self, connection_id: &str) {
        if let Ok(mut gone) = self.gone.lock() {
            gone.insert(connection_id.to_string());
        }
    }

    /// Messages pushed so far, as `(connection_id, body)` pairs.
    pub fn sent_messages(&self) -> Vec<(String, String)> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }

    pub fn messages_for(&self, connection_id: &str) -> Vec<String> {
        self.sent_messages()
            .into_iter()
            .filter(|(id, _)| id == connection_id)
            .map(|(_, body)| body)
            .collect()
    }

    fn poisoned<T>(_: T) -> ConnectionRepositoryError {
        ConnectionRepositoryError::DynamoDb("in-memory registry lock poisoned".to_string())
    }
}

#[async_trait]
impl ConnectionRepository for InMemoryConnectionRepository {
    async fn store_connection(
        &self,
        connection: &PlayerConnection,
    ) -> Result<(), ConnectionRepositoryError> {
        let mut connections = self.connections.lock().map_err(Self::poisoned)?;
        connections.insert(connection.connection_id.clone(), connection.clone());
        Ok(())
    }

    async fn get_connection(
        &self,
        connection_id: &str,
    ) -> Result<Option<PlayerConnection>, ConnectionRepositoryError> {
        let connections = self.connections.lock().map_err(Self::poisoned)?;
        Ok(connections.get(connection_id).cloned())
    }

    async fn remove_connection(
        &self,
        connection_id: &str,
    ) -> Result<(), ConnectionRepositoryError> {
        let mut connections = self.connections.lock().map_err(Self::poisoned)?;
        connections.remove(connection_id);
        Ok(())
    }

    async fn connections_for_game(
        &self,
        game_id: &str,
    ) -> Result<Vec<PlayerConnection>, ConnectionRepositoryError> {
        let connections = self.connections.lock().map_err(Self::poisoned)?;
        let mut matching: Vec<PlayerConnection> = connections
            .values()
            .filter(|connection| connection.game_id.as_deref() == Some(game_id))
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.connection_id.cmp(&b.connection_id));
        Ok(matching)
    }

    async fn send_message(
        &self,
        connection_id: &str,
        message: &str,
    ) -> Result<(), ConnectionRepositoryError> {
        if self
            .gone
            .lock()
            .map_err(Self::poisoned)?
            .contains(connection_id)
        {
            return Err(ConnectionRepositoryError::Gone);
        }
        let mut sent = self.sent.lock().map_err(Self::poisoned)?;
        sent.push((connection_id.to_string(), message.to_string()));
        Ok(())
    }
}
