use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{HistoryStore, HistoryStoreError};
use crate::message::Message;

/// File-backed history storage: the whole message list serialized as one
/// JSON document.
///
/// Saves go through a temp file followed by a rename so a crash mid-write
/// never leaves a truncated record behind.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl HistoryStore for JsonFileStore {
    async fn load(&self) -> Result<Vec<Message>, HistoryStoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes).map_err(|e| HistoryStoreError::Codec(e.to_string()))
    }

    async fn save(&self, messages: &[Message]) -> Result<(), HistoryStoreError> {
        let json = serde_json::to_vec_pretty(messages)
            .map_err(|e| HistoryStoreError::Codec(e.to_string()))?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}
