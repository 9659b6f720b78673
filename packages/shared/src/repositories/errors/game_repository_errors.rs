#[derive(Debug, Clone, PartialEq)]
pub enum GameSessionRepositoryError {
    Serialization(String),
    DynamoDb(String),
    TransactionError(String),
    /// The stored revision no longer matches the one the write was based on.
    Conflict,
}

impl std::fmt::Display for GameSessionRepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameSessionRepositoryError::Serialization(msg) => {
                write!(f, "Serialization error: {}", msg)
            }
            GameSessionRepositoryError::DynamoDb(msg) => write!(f, "DynamoDB error: {}", msg),
            GameSessionRepositoryError::TransactionError(msg) => {
                write!(f, "Transaction error: {}", msg)
            }
            GameSessionRepositoryError::Conflict => {
                write!(f, "Game session was modified concurrently")
            }
        }
    }
}

impl std::error::Error for GameSessionRepositoryError {}
