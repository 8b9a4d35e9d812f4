//! File-backed transcript store.
//!
//! Persists the transcript as a single JSON slot holding an array of
//! `{role, content}` records, matching what the advisory backend
//! expects as prior-turn context.

use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use tracing::warn;

use super::traits::{TranscriptStore, Turn};

/// A transcript store backed by one JSON file under the workspace dir.
pub struct FileTranscriptStore {
    path: PathBuf,
    turns: Mutex<Vec<Turn>>,
}

impl FileTranscriptStore {
    pub fn new(workspace_dir: &Path, slot: &str) -> Self {
        Self {
            path: workspace_dir.join(slot),
            turns: Mutex::new(Vec::new()),
        }
    }

    /// Path of the backing slot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the given turns to the slot. An empty transcript removes
    /// the slot instead of leaving a stale file behind.
    async fn persist(&self, turns: &[Turn]) -> Result<()> {
        if turns.is_empty() {
            match tokio::fs::remove_file(&self.path).await {
                Ok(()) => return Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!("failed to remove transcript slot {}", self.path.display())
                    })
                }
            }
        }

        let bytes = serde_json::to_vec(turns).context("failed to serialize transcript")?;
        tokio::fs::write(&self.path, bytes)
            .await
            .with_context(|| format!("failed to write transcript slot {}", self.path.display()))
    }
}

#[async_trait]
impl TranscriptStore for FileTranscriptStore {
    async fn load(&self) -> usize {
        let restored: Vec<Turn> = match tokio::fs::read(&self.path).await {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(turns) => turns,
                Err(e) => {
                    warn!(
                        "unreadable transcript slot {}: {e}; starting empty",
                        self.path.display()
                    );
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                warn!(
                    "failed to read transcript slot {}: {e}; starting empty",
                    self.path.display()
                );
                Vec::new()
            }
        };

        let count = restored.len();
        *self.turns.lock() = restored;
        count
    }

    async fn append(&self, turn: Turn) -> Result<()> {
        let snapshot = {
            let mut turns = self.turns.lock();
            turns.push(turn);
            turns.clone()
        };
        self.persist(&snapshot).await
    }

    async fn snapshot(&self) -> Vec<Turn> {
        self.turns.lock().clone()
    }

    async fn replace_all(&self, turns: Vec<Turn>) -> Result<()> {
        let snapshot = {
            let mut current = self.turns.lock();
            *current = turns;
            current.clone()
        };
        self.persist(&snapshot).await
    }

    async fn clear(&self) -> Result<()> {
        self.turns.lock().clear();
        self.persist(&[]).await
    }

    fn name(&self) -> &str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(tmp: &TempDir) -> FileTranscriptStore {
        FileTranscriptStore::new(tmp.path(), "transcript.json")
    }

    #[tokio::test]
    async fn load_missing_slot_yields_empty() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        assert_eq!(store.load().await, 0);
        assert!(store.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn load_corrupt_slot_yields_empty() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("transcript.json"), "{not json").unwrap();

        let store = store_in(&tmp);
        assert_eq!(store.load().await, 0);
        assert!(store.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn append_then_reload_round_trips() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        store.append(Turn::user("What are my chances at USC?")).await.unwrap();
        store.append(Turn::assistant("Here is what the data says.")).await.unwrap();
        let before = store.snapshot().await;

        // Simulated reload: a fresh store over the same slot.
        let reloaded = store_in(&tmp);
        assert_eq!(reloaded.load().await, 2);
        assert_eq!(reloaded.snapshot().await, before);
    }

    #[tokio::test]
    async fn slot_holds_plain_role_content_records() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        store.append(Turn::user("hello")).await.unwrap();

        let raw = std::fs::read_to_string(tmp.path().join("transcript.json")).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed[0]["role"], "user");
        assert_eq!(parsed[0]["content"], "hello");
    }

    #[tokio::test]
    async fn replace_all_swaps_and_persists() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        store.append(Turn::user("one")).await.unwrap();
        store.append(Turn::user("two")).await.unwrap();

        store.replace_all(vec![Turn::user("only")]).await.unwrap();
        assert_eq!(store.snapshot().await.len(), 1);

        let reloaded = store_in(&tmp);
        assert_eq!(reloaded.load().await, 1);
        assert_eq!(reloaded.snapshot().await[0].content, "only");
    }

    #[tokio::test]
    async fn replace_all_with_empty_removes_slot() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        store.append(Turn::user("one")).await.unwrap();
        assert!(tmp.path().join("transcript.json").exists());

        store.replace_all(Vec::new()).await.unwrap();
        assert!(!tmp.path().join("transcript.json").exists());
    }

    #[tokio::test]
    async fn clear_then_load_yields_empty() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        store.append(Turn::user("one")).await.unwrap();
        store.clear().await.unwrap();

        assert!(!tmp.path().join("transcript.json").exists());
        let reloaded = store_in(&tmp);
        assert_eq!(reloaded.load().await, 0);
    }
}
