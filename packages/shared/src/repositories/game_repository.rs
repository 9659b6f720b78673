use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::operation::update_item::UpdateItemError;
use aws_sdk_dynamodb::types::{
    AttributeValue, Put, ReturnValue, ReturnValuesOnConditionCheckFailure, TransactWriteItem,
    Update,
};
use aws_sdk_dynamodb::Client;
use chrono::{DateTime, Utc};
use serde_dynamo::{from_item, to_attribute_value, to_item};
use tracing::{debug, warn};

use crate::config::StorageSettings;
use crate::models::game_session::{GameSession, GameStateUpdate};
use crate::models::move_record::MoveRecord;
use crate::repositories::errors::game_repository_errors::GameSessionRepositoryError;

#[cfg(test)]
use mockall::automock;

/// Storage contract for sessions and their move history.
///
/// Writes that change a session take the session as it was read and must fail
/// with [`GameSessionRepositoryError::Conflict`] when the stored revision has
/// moved on in the meantime.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait GameSessionRepository: Send + Sync {
    async fn create_game(&self, game_session: &GameSession)
        -> Result<(), GameSessionRepositoryError>;

    async fn find_by_id(
        &self,
        game_id: &str,
    ) -> Result<Option<GameSession>, GameSessionRepositoryError>;

    /// Returns `None` when the session no longer exists.
    async fn update_state(
        &self,
        current: &GameSession,
        update: &GameStateUpdate,
    ) -> Result<Option<GameSession>, GameSessionRepositoryError>;

    async fn append_move(&self, record: &MoveRecord) -> Result<(), GameSessionRepositoryError>;

    /// Updates the session and appends the move as a single atomic write.
    async fn commit_move(
        &self,
        current: &GameSession,
        update: &GameStateUpdate,
        record: &MoveRecord,
    ) -> Result<GameSession, GameSessionRepositoryError>;

    /// Moves of a session in the order they were played.
    async fn list_moves(&self, game_id: &str)
        -> Result<Vec<MoveRecord>, GameSessionRepositoryError>;
}

pub struct DynamoDbGameSessionRepository {
    pub client: Client,
    pub games_table: String,
    pub moves_table: String,
}

impl DynamoDbGameSessionRepository {
    pub fn new(client: Client, settings: &StorageSettings) -> Self {
        Self {
            client,
            games_table: settings.games_table.clone(),
            moves_table: settings.moves_table.clone(),
        }
    }
}

const VERSION_CONDITION: &str = "attribute_exists(#id) AND #version = :expected_version";

/// SET expression for a partial update, guarded by the session revision.
struct UpdateExpression {
    expression: String,
    names: HashMap<String, String>,
    values: HashMap<String, AttributeValue>,
}

impl UpdateExpression {
    fn build(
        current: &GameSession,
        update: &GameStateUpdate,
        now: DateTime<Utc>,
    ) -> Result<Self, GameSessionRepositoryError> {
        let mut builder = UpdateExpression {
            expression: String::new(),
            names: HashMap::new(),
            values: HashMap::new(),
        };

        if let Some(position) = &update.position {
            builder.set("position", position)?;
        }
        if let Some(turn) = &update.turn {
            builder.set("turn", turn)?;
        }
        if let Some(status) = &update.status {
            builder.set("status", status)?;
        }
        if let Some(result) = &update.result {
            builder.set("result", result)?;
        }
        if let Some(reason) = &update.ended_reason {
            builder.set("ended_reason", reason)?;
        }
        if let Some(record) = &update.record {
            builder.set("record", record)?;
        }
        if let Some(joined) = &update.white_joined {
            builder.set("white_joined", joined)?;
        }
        if let Some(joined) = &update.black_joined {
            builder.set("black_joined", joined)?;
        }
        builder.set("version", &(current.version + 1))?;
        builder.set("updated_at", &now)?;

        builder.names.insert("#id".to_string(), "id".to_string());
        builder.values.insert(
            ":expected_version".to_string(),
            AttributeValue::N(current.version.to_string()),
        );

        Ok(builder)
    }

    fn set<T: serde::Serialize>(
        &mut self,
        field: &str,
        value: &T,
    ) -> Result<(), GameSessionRepositoryError> {
        let value: AttributeValue = to_attribute_value(value)
            .map_err(|e| GameSessionRepositoryError::Serialization(e.to_string()))?;

        self.expression.push_str(if self.expression.is_empty() {
            "SET "
        } else {
            ", "
        });
        self.expression
            .push_str(&format!("#{field} = :{field}", field = field));
        self.names.insert(format!("#{}", field), field.to_string());
        self.values.insert(format!(":{}", field), value);
        Ok(())
    }
}

#[async_trait]
impl GameSessionRepository for DynamoDbGameSessionRepository {
    async fn create_game(
        &self,
        game_session: &GameSession,
    ) -> Result<(), GameSessionRepositoryError> {
        let item = to_item(game_session)
            .map_err(|e| GameSessionRepositoryError::Serialization(e.to_string()))?;

        self.client
            .put_item()
            .table_name(&self.games_table)
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(id)")
            .send()
            .await
            .map_err(|e| GameSessionRepositoryError::DynamoDb(e.to_string()))?;

        debug!("Created game session {}", game_session.id);
        Ok(())
    }

    async fn find_by_id(
        &self,
        game_id: &str,
    ) -> Result<Option<GameSession>, GameSessionRepositoryError> {
        let result = self
            .client
            .get_item()
            .table_name(&self.games_table)
            .key("id", AttributeValue::S(game_id.to_string()))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| GameSessionRepositoryError::DynamoDb(e.to_string()))?;

        if let Some(item) = result.item {
            let game_session: GameSession = from_item(item)
                .map_err(|e| GameSessionRepositoryError::Serialization(e.to_string()))?;
            Ok(Some(game_session))
        } else {
            Ok(None)
        }
    }

    async fn update_state(
        &self,
        current: &GameSession,
        update: &GameStateUpdate,
    ) -> Result<Option<GameSession>, GameSessionRepositoryError> {
        let parts = UpdateExpression::build(current, update, Utc::now())?;

        let result = self
            .client
            .update_item()
            .table_name(&self.games_table)
            .key("id", AttributeValue::S(current.id.clone()))
            .update_expression(parts.expression)
            .condition_expression(VERSION_CONDITION)
            .set_expression_attribute_names(Some(parts.names))
            .set_expression_attribute_values(Some(parts.values))
            .return_values(ReturnValue::AllNew)
            .return_values_on_condition_check_failure(ReturnValuesOnConditionCheckFailure::AllOld)
            .send()
            .await;

        match result {
            Ok(output) => {
                let attributes = output.attributes.ok_or_else(|| {
                    GameSessionRepositoryError::DynamoDb(
                        "UpdateItem returned no attributes".to_string(),
                    )
                })?;
                let game_session: GameSession = from_item(attributes)
                    .map_err(|e| GameSessionRepositoryError::Serialization(e.to_string()))?;
                Ok(Some(game_session))
            }
            Err(e) => {
                if let SdkError::ServiceError(service_err) = &e {
                    if let UpdateItemError::ConditionalCheckFailedException(failed) =
                        service_err.err()
                    {
                        // No old image means the row is gone rather than stale
                        if failed.item().is_none() {
                            return Ok(None);
                        }
                        warn!("Stale update rejected for game session {}", current.id);
                        return Err(GameSessionRepositoryError::Conflict);
                    }
                }
                Err(GameSessionRepositoryError::DynamoDb(e.to_string()))
            }
        }
    }

    async fn append_move(&self, record: &MoveRecord) -> Result<(), GameSessionRepositoryError> {
        let item =
            to_item(record).map_err(|e| GameSessionRepositoryError::Serialization(e.to_string()))?;

        let result = self
            .client
            .put_item()
            .table_name(&self.moves_table)
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(game_id)")
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                if let SdkError::ServiceError(service_err) = &e {
                    if service_err.err().is_conditional_check_failed_exception() {
                        return Err(GameSessionRepositoryError::Conflict);
                    }
                }
                Err(GameSessionRepositoryError::DynamoDb(e.to_string()))
            }
        }
    }

    async fn commit_move(
        &self,
        current: &GameSession,
        update: &GameStateUpdate,
        record: &MoveRecord,
    ) -> Result<GameSession, GameSessionRepositoryError> {
        let now = Utc::now();
        let parts = UpdateExpression::build(current, update, now)?;
        let move_item =
            to_item(record).map_err(|e| GameSessionRepositoryError::Serialization(e.to_string()))?;

        // Session update and move insert succeed or fail together
        let transaction_items = vec![
            TransactWriteItem::builder()
                .update(
                    Update::builder()
                        .table_name(&self.games_table)
                        .key("id", AttributeValue::S(current.id.clone()))
                        .update_expression(parts.expression)
                        .condition_expression(VERSION_CONDITION)
                        .set_expression_attribute_names(Some(parts.names))
                        .set_expression_attribute_values(Some(parts.values))
                        .build()
                        .map_err(|e| GameSessionRepositoryError::TransactionError(e.to_string()))?,
                )
                .build(),
            TransactWriteItem::builder()
                .put(
                    Put::builder()
                        .table_name(&self.moves_table)
                        .set_item(Some(move_item))
                        .condition_expression("attribute_not_exists(game_id)")
                        .build()
                        .map_err(|e| GameSessionRepositoryError::TransactionError(e.to_string()))?,
                )
                .build(),
        ];

        let result = self
            .client
            .transact_write_items()
            .set_transact_items(Some(transaction_items))
            .send()
            .await;

        if let Err(e) = result {
            if let SdkError::ServiceError(service_err) = &e {
                if service_err.err().is_transaction_canceled_exception() {
                    warn!(
                        "Move transaction cancelled for game session {} at ply {}",
                        current.id, record.ply
                    );
                    return Err(GameSessionRepositoryError::Conflict);
                }
            }
            return Err(GameSessionRepositoryError::TransactionError(e.to_string()));
        }

        let mut committed = current.clone();
        update.apply_to(&mut committed, now);
        Ok(committed)
    }

    async fn list_moves(
        &self,
        game_id: &str,
    ) -> Result<Vec<MoveRecord>, GameSessionRepositoryError> {
        let mut moves = Vec::new();
        let mut exclusive_start_key = None;

        loop {
            let output = self
                .client
                .query()
                .table_name(&self.moves_table)
                .key_condition_expression("game_id = :game_id")
                .expression_attribute_values(":game_id", AttributeValue::S(game_id.to_string()))
                .scan_index_forward(true)
                .consistent_read(true)
                .set_exclusive_start_key(exclusive_start_key)
                .send()
                .await
                .map_err(|e| GameSessionRepositoryError::DynamoDb(e.to_string()))?;

            if let Some(items) = output.items {
                for item in items {
                    let record: MoveRecord = from_item(item)
                        .map_err(|e| GameSessionRepositoryError::Serialization(e.to_string()))?;
                    moves.push(record);
                }
            }

            match output.last_evaluated_key {
                Some(key) if !key.is_empty() => exclusive_start_key = Some(key),
                _ => break,
            }
        }

        moves.sort_by_key(|record| record.ply);
        Ok(moves)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::game_session::{Color, EndReason, GameResult};

    #[test]
    fn test_update_expression_sets_changed_fields_and_revision() {
        let session = GameSession::new();
        let update = GameStateUpdate {
            position: Some("8/8/8/8/8/8/8/K6k b - - 0 1".to_string()),
            turn: Some(Color::Black),
            ..Default::default()
        };

        let parts = UpdateExpression::build(&session, &update, Utc::now()).unwrap();

        assert_eq!(
            parts.expression,
            "SET #position = :position, #turn = :turn, #version = :version, #updated_at = :updated_at"
        );
        assert_eq!(parts.values[":turn"], AttributeValue::S("black".to_string()));
        assert_eq!(parts.values[":version"], AttributeValue::N("1".to_string()));
        assert_eq!(
            parts.values[":expected_version"],
            AttributeValue::N("0".to_string())
        );
        assert_eq!(parts.names["#id"], "id");
        assert!(!parts.names.contains_key("#status"));
    }

    #[test]
    fn test_update_expression_for_game_end() {
        let mut session = GameSession::new();
        session.version = 7;
        let update = GameStateUpdate::ended(GameResult::BlackWin, EndReason::Resignation);

        let parts = UpdateExpression::build(&session, &update, Utc::now()).unwrap();

        assert!(parts.expression.contains("#status = :status"));
        assert!(parts.expression.contains("#ended_reason = :ended_reason"));
        assert_eq!(parts.values[":status"], AttributeValue::S("ended".to_string()));
        assert_eq!(
            parts.values[":ended_reason"],
            AttributeValue::S("resignation".to_string())
        );
        assert_eq!(parts.values[":version"], AttributeValue::N("8".to_string()));
    }

    #[test]
    fn test_game_session_item_uses_plain_attributes() {
        let session = GameSession::new();

        let item: HashMap<String, AttributeValue> = to_item(&session).unwrap();

        assert_eq!(item["id"], AttributeValue::S(session.id.clone()));
        assert_eq!(item["status"], AttributeValue::S("waiting".to_string()));
        assert_eq!(item["version"], AttributeValue::N("0".to_string()));

        let restored: GameSession = from_item(item).unwrap();
        assert_eq!(restored.white_credential, session.white_credential);
    }
}
