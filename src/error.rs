use thiserror::Error;

use crate::domain::ItemId;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Storage-layer errors.
///
/// Only [`StorageError::Busy`] and [`StorageError::Connection`] are transient;
/// the retry policy gives up immediately on anything else.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("database busy: {0}")]
    Busy(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("migration error: {0}")]
    Migration(String),
}

impl StorageError {
    /// Whether retrying the same operation may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Busy(_) | Self::Connection(_))
    }
}

impl From<diesel::result::Error> for StorageError {
    fn from(err: diesel::result::Error) -> Self {
        match &err {
            diesel::result::Error::DatabaseError(_, info) => {
                let message = info.message().to_ascii_lowercase();
                if message.contains("locked") || message.contains("busy") {
                    Self::Busy(err.to_string())
                } else {
                    Self::Database(err.to_string())
                }
            }
            _ => Self::Database(err.to_string()),
        }
    }
}

impl From<diesel::r2d2::PoolError> for StorageError {
    fn from(err: diesel::r2d2::PoolError) -> Self {
        Self::Connection(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("{operation} failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        operation: &'static str,
        attempts: u32,
        #[source]
        last: Box<Error>,
    },

    #[error("corrupt presence row {row_id} for item {item_id}: start {start} > end {end}")]
    CorruptPresenceData {
        row_id: i32,
        item_id: ItemId,
        start: i64,
        end: i64,
    },

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether the error comes from a transient storage condition.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Storage(e) if e.is_transient())
    }
}

impl From<diesel::result::Error> for Error {
    fn from(err: diesel::result::Error) -> Self {
        Error::Storage(err.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
