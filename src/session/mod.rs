//! Conversational session management — the advisory chat core.
//!
//! Turns a sequence of user questions into one logical advisory
//! session against the stateful remote service: admission control via
//! the quota gate, optimistic transcript appends with verbatim
//! rollback, create-vs-continue dispatch on the session binding, and
//! discard of responses that outlive a "new chat" reset.

pub mod manager;

pub use manager::{SendError, SessionBinding, SessionManager, TurnOutcome};

use crate::advisor;
use crate::config::Config;
use crate::quota::{QuotaGate, QuotaLimit};
use crate::transcript;
use anyhow::Result;

/// Follow-up questions shown before the advisor has suggested any.
pub const DEFAULT_SUGGESTIONS: [&str; 4] = [
    "What are my chances at my top-choice school?",
    "How should I prioritize my extracurriculars?",
    "Which scholarships should I apply for first?",
    "What makes a personal essay stand out?",
];

/// Wrap a raw question in the fixed grounding template.
///
/// This is part of the protocol contract with the advisory service:
/// the model must answer only from the curated admissions knowledge
/// base and say so when the material is not covered.
pub fn grounded_prompt(question: &str) -> String {
    format!(
        "Answer using only the curated admissions knowledge base. \
         If the knowledge base does not cover the question, say so \
         explicitly instead of guessing.\n\nQuestion: {question}"
    )
}

/// Factory: assemble a session manager from config.
pub fn create_session_manager(config: &Config) -> Result<SessionManager> {
    let store = transcript::create_transcript_store(&config.transcript, &config.workspace_dir)?;
    let backend = advisor::create_backend(&config.advisor, config.api_key.as_deref())?;
    let quota = QuotaGate::new(QuotaLimit::from_monthly_limit(config.quota.monthly_limit));

    let mut manager = SessionManager::new(store, backend, quota, config.user_id())
        .with_default_suggestions(config.suggestions.defaults.clone());

    // The session binding only survives restarts when the transcript
    // does; an ephemeral transcript with a durable binding would replay
    // context the backend no longer has locally.
    if config.transcript.backend.trim() == "file" {
        manager = manager.with_binding_slot(config.workspace_dir.join("session.json"));
    }

    Ok(manager)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grounded_prompt_embeds_question_and_contract() {
        let prompt = grounded_prompt("What are my chances at USC?");
        assert!(prompt.contains("What are my chances at USC?"));
        assert!(prompt.contains("curated admissions knowledge base"));
    }

    #[test]
    fn default_suggestions_are_nonempty() {
        assert!(!DEFAULT_SUGGESTIONS.is_empty());
        assert!(DEFAULT_SUGGESTIONS.iter().all(|s| !s.trim().is_empty()));
    }

    #[tokio::test]
    async fn factory_builds_from_default_config() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut config: Config = toml::from_str("").unwrap();
        config.workspace_dir = tmp.path().to_path_buf();
        config.config_path = tmp.path().join("config.toml");

        let manager = create_session_manager(&config).unwrap();
        assert!(manager.session_id().is_none());
        assert_eq!(manager.hydrate().await, 0);
    }
}
