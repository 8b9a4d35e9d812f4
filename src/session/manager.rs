//! The session manager: owns one conversation's transcript, remote
//! session binding, quota mirror, and suggestion list.

use crate::advisor::AdvisorBackend;
use crate::quota::{Admission, QuotaGate, QuotaLimit};
use crate::transcript::{TranscriptStore, Turn};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use thiserror::Error;
use tracing::{debug, error, warn};

use super::grounded_prompt;

/// Binding between the local transcript and remote conversation state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionBinding {
    /// No remote conversation yet; the next turn creates one.
    Unbound,
    /// Remote conversation active; every turn must reuse the handle.
    Bound { id: String, bound_at: DateTime<Utc> },
}

impl SessionBinding {
    pub fn session_id(&self) -> Option<&str> {
        match self {
            SessionBinding::Bound { id, .. } => Some(id),
            SessionBinding::Unbound => None,
        }
    }

    pub fn is_bound(&self) -> bool {
        matches!(self, SessionBinding::Bound { .. })
    }
}

/// Why a submission was not answered.
#[derive(Debug, Error)]
pub enum SendError {
    /// A previous turn is still outstanding; at most one logical turn
    /// may be in flight per transcript.
    #[error("another question is still in flight")]
    TurnInFlight,
    /// The quota mirror is exhausted. Surfaced as an upgrade prompt,
    /// not a failure; nothing was appended or sent.
    #[error("question limit reached for this billing period")]
    QuotaExhausted,
    /// Transport or parse failure. The transcript was rolled back to
    /// its pre-submission state; resubmitting is safe.
    #[error("advisor request failed: {0}")]
    Backend(anyhow::Error),
}

/// Result of a completed turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Answered {
        answer: String,
        suggestions: Vec<String>,
    },
    /// The reply arrived after a reset and was discarded; no state was
    /// touched and the quota was not charged.
    Superseded,
}

/// Durable copy of the session binding, kept in its own slot beside
/// the transcript.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedBinding {
    #[serde(rename = "sessionId")]
    session_id: String,
    #[serde(rename = "boundAt")]
    bound_at: DateTime<Utc>,
}

async fn load_persisted_binding(path: &Path) -> Option<PersistedBinding> {
    match tokio::fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(binding) => Some(binding),
            Err(e) => {
                warn!(
                    "unreadable session slot {}: {e}; starting unbound",
                    path.display()
                );
                None
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            warn!(
                "failed to read session slot {}: {e}; starting unbound",
                path.display()
            );
            None
        }
    }
}

/// One conversation's state machine. Collaborators are injected; there
/// is no ambient global state.
pub struct SessionManager {
    store: Box<dyn TranscriptStore>,
    backend: Box<dyn AdvisorBackend>,
    quota: QuotaGate,
    binding: Mutex<SessionBinding>,
    binding_slot: Option<PathBuf>,
    suggestions: Mutex<Vec<String>>,
    default_suggestions: Vec<String>,
    in_flight: AtomicBool,
    generation: AtomicU64,
    user_id: String,
}

impl SessionManager {
    pub fn new(
        store: Box<dyn TranscriptStore>,
        backend: Box<dyn AdvisorBackend>,
        quota: QuotaGate,
        user_id: &str,
    ) -> Self {
        Self {
            store,
            backend,
            quota,
            binding: Mutex::new(SessionBinding::Unbound),
            binding_slot: None,
            suggestions: Mutex::new(Vec::new()),
            default_suggestions: super::DEFAULT_SUGGESTIONS
                .iter()
                .map(ToString::to_string)
                .collect(),
            in_flight: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            user_id: user_id.to_string(),
        }
    }

    /// Persist the session binding to the given slot so it survives
    /// restarts together with the transcript.
    pub fn with_binding_slot(mut self, path: PathBuf) -> Self {
        self.binding_slot = Some(path);
        self
    }

    pub fn with_default_suggestions(mut self, defaults: Vec<String>) -> Self {
        if !defaults.is_empty() {
            self.default_suggestions = defaults;
        }
        self
    }

    /// Restore transcript and session binding from durable storage.
    /// Returns the number of turns restored.
    pub async fn hydrate(&self) -> usize {
        let restored = self.store.load().await;
        if let Some(path) = &self.binding_slot {
            if let Some(persisted) = load_persisted_binding(path).await {
                *self.binding.lock() = SessionBinding::Bound {
                    id: persisted.session_id,
                    bound_at: persisted.bound_at,
                };
            }
        }
        restored
    }

    /// Execute one turn: admission check, optimistic append, remote
    /// call, reconciliation. See [`SendError`] for the failure modes.
    pub async fn send(&self, text: &str) -> Result<TurnOutcome, SendError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(SendError::TurnInFlight);
        }

        let result = self.send_inner(text).await;
        self.in_flight.store(false, Ordering::SeqCst);
        result
    }

    async fn send_inner(&self, text: &str) -> Result<TurnOutcome, SendError> {
        // Strictly before the optimistic append: a denied turn never
        // appears in history.
        if self.quota.admit() == Admission::Denied {
            return Err(SendError::QuotaExhausted);
        }

        let generation = self.generation.load(Ordering::SeqCst);
        let snapshot = self.store.snapshot().await;

        if let Err(e) = self.store.append(Turn::user(text)).await {
            self.rollback(generation, &snapshot).await;
            return Err(SendError::Backend(e));
        }

        // The transcript keeps the raw question; the wire carries the
        // grounding template around it.
        let query = grounded_prompt(text);
        let bound_id = { self.binding.lock().session_id().map(str::to_owned) };

        let call = match &bound_id {
            None => self
                .backend
                .create_session(&query, &self.user_id)
                .await
                .map(|created| (created.session_id, created.reply)),
            Some(id) => self
                .backend
                .continue_session(id, &query, &self.user_id, &snapshot)
                .await
                .map(|reply| (None, reply)),
        };

        let (new_handle, reply) = match call {
            Ok(ok) => ok,
            Err(e) => {
                self.rollback(generation, &snapshot).await;
                return Err(SendError::Backend(e));
            }
        };

        // A reset happened while the call was outstanding: the reply
        // belongs to a conversation that no longer exists.
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!("discarding advisor reply issued before a reset");
            return Ok(TurnOutcome::Superseded);
        }

        if let Err(e) = self.store.append(Turn::assistant(&reply.answer)).await {
            self.rollback(generation, &snapshot).await;
            return Err(SendError::Backend(e));
        }

        if bound_id.is_none() {
            match new_handle {
                Some(id) => self.bind(id).await,
                None => {
                    warn!("create response carried no session identifier; staying unbound");
                }
            }
        }

        if let Some(list) = reply.suggested_questions {
            *self.suggestions.lock() = list;
        }

        self.quota.record_success();

        Ok(TurnOutcome::Answered {
            answer: reply.answer,
            suggestions: self.suggestions(),
        })
    }

    /// Restore the pre-submission snapshot verbatim, unless a reset
    /// already replaced the transcript.
    async fn rollback(&self, generation: u64, snapshot: &[Turn]) {
        if self.generation.load(Ordering::SeqCst) != generation {
            return;
        }
        if let Err(e) = self.store.replace_all(snapshot.to_vec()).await {
            error!("failed to roll back transcript after a failed turn: {e}");
        }
    }

    async fn bind(&self, id: String) {
        let bound_at = Utc::now();
        {
            *self.binding.lock() = SessionBinding::Bound {
                id: id.clone(),
                bound_at,
            };
        }

        if let Some(path) = &self.binding_slot {
            let persisted = PersistedBinding {
                session_id: id,
                bound_at,
            };
            match serde_json::to_vec(&persisted) {
                Ok(bytes) => {
                    if let Err(e) = tokio::fs::write(path, bytes).await {
                        warn!("failed to persist session slot {}: {e}", path.display());
                    }
                }
                Err(e) => warn!("failed to serialize session binding: {e}"),
            }
        }
    }

    /// Start a new chat: transcript and session binding are cleared
    /// together, and any still-outstanding reply becomes void.
    pub async fn reset(&self) -> anyhow::Result<()> {
        self.generation.fetch_add(1, Ordering::SeqCst);
        {
            *self.binding.lock() = SessionBinding::Unbound;
        }
        self.suggestions.lock().clear();

        if let Some(path) = &self.binding_slot {
            match tokio::fs::remove_file(path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("failed to remove session slot {}: {e}", path.display()),
            }
        }

        self.store.clear().await
    }

    /// Sign-out clears the same state as a new chat.
    pub async fn sign_out(&self) -> anyhow::Result<()> {
        self.reset().await
    }

    /// Follow-up questions for the most recent successful turn, or the
    /// static defaults when the advisor has not suggested any.
    pub fn suggestions(&self) -> Vec<String> {
        let current = self.suggestions.lock();
        if current.is_empty() {
            self.default_suggestions.clone()
        } else {
            current.clone()
        }
    }

    pub fn session_id(&self) -> Option<String> {
        self.binding.lock().session_id().map(str::to_owned)
    }

    pub fn binding(&self) -> SessionBinding {
        self.binding.lock().clone()
    }

    pub fn quota_remaining(&self) -> QuotaLimit {
        self.quota.remaining()
    }

    pub fn quota_limit(&self) -> QuotaLimit {
        self.quota.limit()
    }

    pub async fn transcript(&self) -> Vec<Turn> {
        self.store.snapshot().await
    }
}
