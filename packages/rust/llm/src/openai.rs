//! OpenAI-compatible chat completions client.
//!
//! Works against any endpoint that speaks `POST {base}/chat/completions`
//! (OpenAI, DeepSeek, and most self-hosted gateways).

use std::time::Duration;

use arxiv_assistant_shared::{AssistantError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::routing::ResolvedProvider;

/// Timeout for a single completion call. Reasoning models can take minutes.
const COMPLETION_TIMEOUT: Duration = Duration::from_secs(300);

// ── Request types ────────────────────────────────────────────────────

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

// ── Response types ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

// ── Client ───────────────────────────────────────────────────────────

/// Client bound to one resolved provider.
pub struct OpenAiCompatClient {
    http: Client,
    provider: ResolvedProvider,
}

impl OpenAiCompatClient {
    pub fn new(http: Client, provider: ResolvedProvider) -> Self {
        Self { http, provider }
    }

    /// Send one non-streaming completion and return the first choice's text.
    pub async fn chat(&self, model: &str, messages: &[ChatMessage]) -> Result<String> {
        let url = format!("{}/chat/completions", self.provider.base_url);
        let request = ChatRequest {
            model,
            messages,
            temperature: self.provider.temperature,
        };

        debug!(provider = %self.provider.name, %url, model, "sending chat completion");

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.provider.api_key)
            .timeout(COMPLETION_TIMEOUT)
            .json(&request)
            .send()
            .await
            .map_err(|e| AssistantError::Provider(format!("{}: {e}", self.provider.name)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let detail: String = body.chars().take(800).collect();
            if detail.trim().is_empty() {
                return Err(AssistantError::Provider(format!(
                    "{}: HTTP {status}",
                    self.provider.name
                )));
            }
            return Err(AssistantError::Provider(format!(
                "{}: HTTP {status}\n{detail}",
                self.provider.name
            )));
        }

        let body: ChatResponse = resp.json().await.map_err(|e| {
            AssistantError::Provider(format!("{}: invalid response body: {e}", self.provider.name))
        })?;

        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| {
                AssistantError::Provider(format!(
                    "{}: response had no choices or content",
                    self.provider.name
                ))
            })
    }
}
