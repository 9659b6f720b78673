use std::env;
use std::fmt;

pub const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:5173";
pub const DEFAULT_CONNECTIONS_GAME_INDEX: &str = "game_id-index";

#[derive(Debug, PartialEq)]
pub enum ConfigError {
    MissingVar(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingVar(name) => {
                write!(f, "{} environment variable must be set", name)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Tables the game service reads and writes.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageSettings {
    pub games_table: String,
    pub moves_table: String,
}

impl StorageSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(StorageSettings {
            games_table: required(&lookup, "GAME_SESSIONS_TABLE")?,
            moves_table: required(&lookup, "GAME_MOVES_TABLE")?,
        })
    }
}

/// Connection registry and the management endpoint used to push messages.
#[derive(Debug, Clone, PartialEq)]
pub struct WebSocketSettings {
    pub connections_table: String,
    pub connections_game_index: String,
    pub api_endpoint: String,
}

impl WebSocketSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Format: https://{api-id}.execute-api.{region}.amazonaws.com/{stage}
        let api_endpoint = match lookup("WEBSOCKET_API_ENDPOINT") {
            Some(endpoint) => endpoint,
            None => {
                let api_id = required(&lookup, "WEBSOCKET_API_ID")?;
                let region = lookup("AWS_REGION").unwrap_or_else(|| "eu-west-1".to_string());
                let stage = lookup("STAGE").unwrap_or_else(|| "dev".to_string());
                format!(
                    "https://{}.execute-api.{}.amazonaws.com/{}",
                    api_id, region, stage
                )
            }
        };

        Ok(WebSocketSettings {
            connections_table: required(&lookup, "PLAYER_CONNECTIONS_TABLE")?,
            connections_game_index: lookup("PLAYER_CONNECTIONS_GAME_INDEX")
                .unwrap_or_else(|| DEFAULT_CONNECTIONS_GAME_INDEX.to_string()),
            api_endpoint,
        })
    }
}

/// Settings for the REST surface.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiSettings {
    pub public_base_url: String,
    pub cors_origin: Option<String>,
}

impl ApiSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let public_base_url = lookup("PUBLIC_BASE_URL")
            .unwrap_or_else(|| DEFAULT_PUBLIC_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        ApiSettings {
            public_base_url,
            cors_origin: lookup("CORS_ORIGIN"),
        }
    }

    pub fn join_url(&self, game_id: &str, credential: &str) -> String {
        format!("{}/g/{}?token={}", self.public_base_url, game_id, credential)
    }
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

fn required<F>(lookup: &F, name: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ConfigError::MissingVar(name.to_string()))
}
