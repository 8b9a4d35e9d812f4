//! Advisory backend traits and normalized response types.

use crate::transcript::Turn;
use anyhow::Result;
use async_trait::async_trait;

/// A parsed advisor response.
///
/// `suggested_questions` is `None` when the backend sent no usable
/// list; the session manager then keeps the previous suggestions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvisorReply {
    pub answer: String,
    pub suggested_questions: Option<Vec<String>>,
}

/// Result of creating a remote conversation.
///
/// The session identifier is already normalized here — whatever field
/// name the wire used, callers only ever see one optional handle. A
/// missing handle is not fatal: the session stays unbound and the next
/// turn retries creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCreated {
    pub session_id: Option<String>,
    pub reply: AdvisorReply,
}

/// Remote advisory service consumed over HTTP.
#[async_trait]
pub trait AdvisorBackend: Send + Sync {
    /// Establish a new remote conversation with the first query.
    async fn create_session(&self, query: &str, user_id: &str) -> Result<SessionCreated>;

    /// Continue an existing conversation, supplying the full prior
    /// transcript so the backend can reconstruct context.
    async fn continue_session(
        &self,
        session_id: &str,
        query: &str,
        user_id: &str,
        prior: &[Turn],
    ) -> Result<AdvisorReply>;

    /// The name of this backend implementation.
    fn name(&self) -> &str;
}
