#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionRepositoryError {
    Serialization(String),
    DynamoDb(String),
    ApiGateway(String),
    /// The client behind the connection id is no longer reachable.
    Gone,
}

impl std::fmt::Display for ConnectionRepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionRepositoryError::Serialization(msg) => {
                write!(f, "Serialization error: {}", msg)
            }
            ConnectionRepositoryError::DynamoDb(msg) => write!(f, "DynamoDB error: {}", msg),
            ConnectionRepositoryError::ApiGateway(msg) => {
                write!(f, "API Gateway error: {}", msg)
            }
            ConnectionRepositoryError::Gone => write!(f, "Connection is gone"),
        }
    }
}

impl std::error::Error for ConnectionRepositoryError {}
