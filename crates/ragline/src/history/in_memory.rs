use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{HistoryStore, HistoryStoreError};
use crate::message::Message;

/// An in-memory implementation of the [`HistoryStore`] trait, for ephemeral
/// surfaces and tests.
#[derive(Default)]
pub struct InMemoryStore {
    messages: Arc<Mutex<Vec<Message>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the currently persisted record.
    pub async fn persisted(&self) -> Vec<Message> {
        self.messages.lock().await.clone()
    }
}

#[async_trait]
impl HistoryStore for InMemoryStore {
    async fn load(&self) -> Result<Vec<Message>, HistoryStoreError> {
        Ok(self.messages.lock().await.clone())
    }

    async fn save(&self, messages: &[Message]) -> Result<(), HistoryStoreError> {
        *self.messages.lock().await = messages.to_vec();
        Ok(())
    }
}
