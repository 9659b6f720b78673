#[derive(Debug, Clone, PartialEq)]
pub enum RulesEngineError {
    MalformedPosition(String),
    Illegal(String),
}

impl std::fmt::Display for RulesEngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RulesEngineError::MalformedPosition(msg) => write!(f, "Malformed position: {}", msg),
            RulesEngineError::Illegal(msg) => write!(f, "Illegal move: {}", msg),
        }
    }
}

impl std::error::Error for RulesEngineError {}
