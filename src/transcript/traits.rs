//! Transcript storage traits and types for advisory conversations.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Who authored a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single turn in the conversation. Immutable once appended; ordering
/// is append-only and defines the history sent back to the advisor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Durable storage for one conversation transcript.
///
/// The store owns the in-memory turn sequence and mirrors every change
/// to its backing slot, so a restart restores exactly the last
/// successfully persisted state.
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    /// Restore the transcript from durable storage. Missing or
    /// unreadable storage yields an empty transcript, never an error.
    /// Returns the number of turns restored.
    async fn load(&self) -> usize;

    /// Append a turn and persist the full transcript.
    async fn append(&self, turn: Turn) -> Result<()>;

    /// The current ordered turn sequence.
    async fn snapshot(&self) -> Vec<Turn>;

    /// Atomically swap the full transcript (rollback path). Swapping in
    /// an empty transcript removes the persisted copy.
    async fn replace_all(&self, turns: Vec<Turn>) -> Result<()>;

    /// Empty the transcript and remove the persisted copy.
    async fn clear(&self) -> Result<()>;

    /// The name of this store implementation.
    fn name(&self) -> &str;
}
