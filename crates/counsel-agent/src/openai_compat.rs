use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use counsel_core::{
    model::{GenerationRequest, ModelBackend},
    types::ChatRole,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::gemini::truncate;

/// Raw REST call to an OpenAI-compatible chat completions endpoint.
///
/// Last-resort strategy: no provider-side schema, but `response_format` forces
/// a JSON object whenever the request wants JSON.
pub struct OpenAiCompatBackend {
    pub base_url: String,
    /// Path appended to `base_url`.
    pub path: String,
    pub api_key: String,
    pub model: String,
    http: reqwest::Client,
}

impl OpenAiCompatBackend {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        http: reqwest::Client,
    ) -> Self {
        Self {
            base_url: "https://api.openai.com".into(),
            path: "/v1/chat/completions".into(),
            api_key: api_key.into(),
            model: model.into(),
            http,
        }
    }

    /// Google's OpenAI-compatible surface for Gemini models.
    pub fn gemini(
        api_key: impl Into<String>,
        model: impl Into<String>,
        http: reqwest::Client,
    ) -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".into(),
            path: "/v1beta/openai/chat/completions".into(),
            ..Self::new(api_key, model, http)
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ChatMessage>,
}

#[async_trait]
impl ModelBackend for OpenAiCompatBackend {
    fn name(&self) -> &str {
        "openai-compat-json"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let mut messages = Vec::with_capacity(request.turns.len() + 1);
        if let Some(system) = &request.system {
            messages.push(ChatMessage {
                role: "system".into(),
                content: Some(system.clone()),
            });
        }
        messages.extend(request.turns.iter().map(|t| ChatMessage {
            role: match t.role {
                ChatRole::User => "user".into(),
                ChatRole::Assistant => "assistant".into(),
            },
            content: Some(t.content.clone()),
        }));

        let body = ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            response_format: request
                .wants_json()
                .then_some(ResponseFormat { kind: "json_object" }),
        };

        info!(
            strategy = self.name(),
            model = %self.model,
            json_output = request.wants_json(),
            "calling chat completions"
        );

        let response = self
            .http
            .post(format!("{}{}", self.base_url, self.path))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("chat completions request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(strategy = self.name(), status = %status, "chat completions returned non-2xx");
            bail!("chat completions returned {status}: {}", truncate(&body));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .context("failed to parse chat completions response")?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .unwrap_or_default();
        if text.trim().is_empty() {
            bail!("chat completions returned no content");
        }
        Ok(text)
    }
}
