use chrono::{ DateTime, Utc };
use log::debug;
use serde::{ Deserialize, Serialize };
use std::fs;
use std::path::{ Path, PathBuf };

use super::ClientError;
use crate::models::chat::ChatMessage;

#[derive(Serialize, Deserialize, Debug)]
struct StoredHistory {
    saved_at: DateTime<Utc>,
    messages: Vec<ChatMessage>,
}

/// Client-local conversation cache, one JSON file per session key.
///
/// Best-effort only: callers log failures and carry on.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(dir: impl AsRef<Path>, key: &str) -> Self {
        Self { path: dir.as_ref().join(format!("{}.json", key)) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, history: &[ChatMessage]) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let stored = StoredHistory { saved_at: Utc::now(), messages: history.to_vec() };
        fs::write(&self.path, serde_json::to_vec_pretty(&stored)?)?;
        debug!("Saved {} messages to {}", history.len(), self.path.display());
        Ok(())
    }

    /// A missing cache is an empty history.
    pub fn load(&self) -> Result<Vec<ChatMessage>, ClientError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read(&self.path)?;
        let stored: StoredHistory = serde_json::from_slice(&raw)?;
        Ok(stored.messages)
    }
}
