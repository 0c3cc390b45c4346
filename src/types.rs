//! Error types for Warden

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WardenError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("version conflict saving {collection}/{id}")]
    Conflict { collection: &'static str, id: String },

    #[error("forbidden")]
    Forbidden,

    #[error("cooldown active: {remaining_ms}ms remaining")]
    Cooldown { remaining_ms: u64 },

    #[error("prompt timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("handler error: {0}")]
    Handler(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<bson::ser::Error> for WardenError {
    fn from(e: bson::ser::Error) -> Self {
        WardenError::Database(format!("BSON encode failed: {e}"))
    }
}

impl From<bson::de::Error> for WardenError {
    fn from(e: bson::de::Error) -> Self {
        WardenError::Database(format!("BSON decode failed: {e}"))
    }
}

pub type Result<T> = std::result::Result<T, WardenError>;
