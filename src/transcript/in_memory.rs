//! In-memory transcript store implementation.
//!
//! Ephemeral: nothing survives the process. Used when
//! `transcript.backend = "memory"` and in tests.

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;

use super::traits::{TranscriptStore, Turn};

/// A transcript store backed by a mutex-protected vector.
pub struct InMemoryTranscriptStore {
    turns: Mutex<Vec<Turn>>,
}

impl InMemoryTranscriptStore {
    pub fn new() -> Self {
        Self {
            turns: Mutex::new(Vec::new()),
        }
    }
}

impl Default for InMemoryTranscriptStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TranscriptStore for InMemoryTranscriptStore {
    async fn load(&self) -> usize {
        // No durable slot to restore from.
        0
    }

    async fn append(&self, turn: Turn) -> Result<()> {
        self.turns.lock().push(turn);
        Ok(())
    }

    async fn snapshot(&self) -> Vec<Turn> {
        self.turns.lock().clone()
    }

    async fn replace_all(&self, turns: Vec<Turn>) -> Result<()> {
        *self.turns.lock() = turns;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.turns.lock().clear();
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
