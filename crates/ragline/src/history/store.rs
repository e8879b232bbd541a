use async_trait::async_trait;

use crate::message::Message;

/// An error type for history persistence operations.
#[derive(Debug, thiserror::Error)]
pub enum HistoryStoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization/Deserialization error: {0}")]
    Codec(String),
    #[error("Other history store error: {0}")]
    Other(String),
}

/// Trait for abstracting durable conversation storage.
///
/// The history is written as one serialized list under a fixed key: read
/// once at startup, saved after every stable mutation. Backends are free to
/// choose their medium (file, browser storage bridge, database).
#[async_trait]
pub trait HistoryStore: Send + Sync + 'static {
    /// Reads the persisted message list. An absent record is an empty list,
    /// not an error.
    async fn load(&self) -> Result<Vec<Message>, HistoryStoreError>;

    /// Replaces the persisted record with the given messages.
    async fn save(&self, messages: &[Message]) -> Result<(), HistoryStoreError>;
}
