//! HTTP advisory backend.
//!
//! Speaks the advisory service's JSON session API: one call to open a
//! conversation, one call per follow-up turn. The service is
//! inconsistent about the name of the returned session identifier
//! (`id` vs `sessionId`); both are accepted and collapsed here so the
//! ambiguity never leaves this module.

use crate::advisor::traits::{AdvisorBackend, AdvisorReply, SessionCreated};
use crate::transcript::Turn;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub struct HttpAdvisorBackend {
    pub(crate) base_url: String,
    pub(crate) api_key: Option<String>,
    client: Client,
}

impl HttpAdvisorBackend {
    pub fn new(base_url: &str, api_key: Option<&str>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.map(ToString::to_string),
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .connect_timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    fn create_url(&self) -> String {
        format!("{}/sessions", self.base_url)
    }

    fn continue_url(&self, session_id: &str) -> String {
        format!("{}/sessions/{session_id}/messages", self.base_url)
    }

    fn apply_auth_header(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => req.header("Authorization", format!("Bearer {key}")),
            None => req,
        }
    }
}

#[derive(Debug, Serialize)]
struct CreateSessionRequest<'a> {
    query: &'a str,
    #[serde(rename = "userId")]
    user_id: &'a str,
}

#[derive(Debug, Serialize)]
struct ContinueSessionRequest<'a> {
    query: &'a str,
    #[serde(rename = "userId")]
    user_id: &'a str,
    #[serde(rename = "priorTurns")]
    prior_turns: &'a [Turn],
}

#[derive(Debug, Deserialize)]
struct CreateSessionResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default, rename = "sessionId")]
    session_id: Option<String>,
    #[serde(default, rename = "answerText")]
    answer_text: Option<String>,
    #[serde(default, rename = "suggestedQuestions")]
    suggested_questions: Option<Vec<String>>,
}

impl CreateSessionResponse {
    /// Normalize the inconsistent identifier field into one handle.
    fn handle(&self) -> Option<String> {
        self.session_id
            .clone()
            .or_else(|| self.id.clone())
            .filter(|id| !id.trim().is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct ContinueSessionResponse {
    #[serde(default, rename = "answerText")]
    answer_text: Option<String>,
    #[serde(default, rename = "suggestedQuestions")]
    suggested_questions: Option<Vec<String>>,
}

fn parse_answer(answer_text: Option<String>) -> anyhow::Result<String> {
    match answer_text {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => anyhow::bail!("advisor response carried no answer text"),
    }
}

#[async_trait]
impl AdvisorBackend for HttpAdvisorBackend {
    async fn create_session(&self, query: &str, user_id: &str) -> anyhow::Result<SessionCreated> {
        let request = CreateSessionRequest { query, user_id };

        let response = self
            .apply_auth_header(self.client.post(self.create_url()).json(&request))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(super::api_error("advisor", response).await);
        }

        let body: CreateSessionResponse = response.json().await?;
        let session_id = body.handle();

        Ok(SessionCreated {
            session_id,
            reply: AdvisorReply {
                answer: parse_answer(body.answer_text)?,
                suggested_questions: body.suggested_questions,
            },
        })
    }

    async fn continue_session(
        &self,
        session_id: &str,
        query: &str,
        user_id: &str,
        prior: &[Turn],
    ) -> anyhow::Result<AdvisorReply> {
        let request = ContinueSessionRequest {
            query,
            user_id,
            prior_turns: prior,
        };

        let response = self
            .apply_auth_header(self.client.post(self.continue_url(session_id)).json(&request))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(super::api_error("advisor", response).await);
        }

        let body: ContinueSessionResponse = response.json().await?;

        Ok(AdvisorReply {
            answer: parse_answer(body.answer_text)?,
            suggested_questions: body.suggested_questions,
        })
    }

    fn name(&self) -> &str {
        "http"
    }
}
