//! Advisory backend subsystem.
//!
//! Implements the factory pattern for remote advisory services. Each
//! backend implements the [`AdvisorBackend`] trait defined in
//! [`traits`] and is registered in [`create_backend`] by its canonical
//! string key.

pub mod http;
pub mod traits;

pub use http::HttpAdvisorBackend;
pub use traits::{AdvisorBackend, AdvisorReply, SessionCreated};

use crate::config::AdvisorConfig;

const MAX_API_ERROR_CHARS: usize = 200;

fn is_secret_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':')
}

fn token_end(input: &str, from: usize) -> usize {
    let mut end = from;
    for (i, c) in input[from..].char_indices() {
        if is_secret_char(c) {
            end = from + i + c.len_utf8();
        } else {
            break;
        }
    }
    end
}

/// Scrub known secret-like token prefixes from upstream error strings.
///
/// Redacts tokens with prefixes like `sk-`, `aw-`, and `Bearer `.
pub fn scrub_secret_patterns(input: &str) -> String {
    const PREFIXES: [&str; 3] = ["sk-", "aw-", "Bearer "];

    let mut scrubbed = input.to_string();

    for prefix in PREFIXES {
        let mut search_from = 0;
        loop {
            let Some(rel) = scrubbed[search_from..].find(prefix) else {
                break;
            };

            let start = search_from + rel;
            let content_start = start + prefix.len();
            let end = token_end(&scrubbed, content_start);

            if end == content_start {
                search_from = content_start;
                continue;
            }

            scrubbed.replace_range(start..end, "[REDACTED]");
            search_from = start + "[REDACTED]".len();
        }
    }

    scrubbed
}

/// Sanitize upstream error text by scrubbing secrets and truncating length.
pub fn sanitize_api_error(input: &str) -> String {
    let scrubbed = scrub_secret_patterns(input);

    if scrubbed.chars().count() <= MAX_API_ERROR_CHARS {
        return scrubbed;
    }

    let mut end = MAX_API_ERROR_CHARS;
    while end > 0 && !scrubbed.is_char_boundary(end) {
        end -= 1;
    }

    format!("{}...", &scrubbed[..end])
}

/// Build a sanitized error from a failed HTTP response.
pub async fn api_error(backend: &str, response: reqwest::Response) -> anyhow::Error {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read error body>".to_string());
    let sanitized = sanitize_api_error(&body);
    anyhow::anyhow!("{backend} API error ({status}): {sanitized}")
}

/// Factory: create the right advisory backend from config.
pub fn create_backend(
    config: &AdvisorConfig,
    api_key: Option<&str>,
) -> anyhow::Result<Box<dyn AdvisorBackend>> {
    match config.backend.trim() {
        "http" => Ok(Box::new(HttpAdvisorBackend::new(&config.base_url, api_key))),
        other if other.is_empty() => {
            anyhow::bail!("advisor.backend cannot be empty. Supported values: http")
        }
        other => anyhow::bail!("Unknown advisor backend '{other}'. Supported values: http"),
    }
}
