use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use counsel_core::{
    model::{GenerationRequest, ModelBackend},
    types::ChatRole,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

/// Cap on how much of an error body is echoed into logs and error text.
const ERROR_BODY_LIMIT: usize = 500;

/// Keys the Gemini `responseSchema` dialect understands.
const GEMINI_SCHEMA_KEYS: &[&str] = &[
    "type",
    "description",
    "enum",
    "properties",
    "required",
    "items",
    "minimum",
    "maximum",
    "minItems",
    "maxItems",
    "nullable",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiVersion {
    /// Current API: system instructions and schema-constrained JSON output.
    V1Beta,
    /// Stable API: plain contents only, no response schema.
    V1,
}

impl ApiVersion {
    fn path(self) -> &'static str {
        match self {
            Self::V1Beta => "v1beta",
            Self::V1 => "v1",
        }
    }
}

/// Calls Google's Generative Language `generateContent` endpoint.
///
/// `structured()` is the preferred strategy: the response schema is sent
/// with the request so the provider constrains the output itself.
/// `legacy()` targets the stable API version and relies on the prompt alone.
pub struct GeminiBackend {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub version: ApiVersion,
    name: String,
    http: reqwest::Client,
}

impl GeminiBackend {
    pub fn structured(
        api_key: impl Into<String>,
        model: impl Into<String>,
        http: reqwest::Client,
    ) -> Self {
        Self::new(api_key, model, ApiVersion::V1Beta, "gemini-structured", http)
    }

    pub fn legacy(
        api_key: impl Into<String>,
        model: impl Into<String>,
        http: reqwest::Client,
    ) -> Self {
        Self::new(api_key, model, ApiVersion::V1, "gemini-legacy", http)
    }

    fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        version: ApiVersion,
        name: &str,
        http: reqwest::Client,
    ) -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".into(),
            api_key: api_key.into(),
            model: model.into(),
            version,
            name: name.into(),
            http,
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}/models/{}:generateContent",
            self.base_url,
            self.version.path(),
            self.model
        )
    }

    fn build_body(&self, request: &GenerationRequest) -> GenerateContentRequest {
        let mut contents: Vec<Content> = request
            .turns
            .iter()
            .map(|t| Content {
                role: match t.role {
                    ChatRole::User => "user".into(),
                    ChatRole::Assistant => "model".into(),
                },
                parts: vec![Part {
                    text: t.content.clone(),
                }],
            })
            .collect();

        match self.version {
            ApiVersion::V1Beta => GenerateContentRequest {
                system_instruction: request.system.as_ref().map(|s| Content {
                    role: "system".into(),
                    parts: vec![Part { text: s.clone() }],
                }),
                contents,
                generation_config: request.response_schema.as_ref().map(|schema| {
                    GenerationConfig {
                        response_mime_type: "application/json".into(),
                        response_schema: Some(to_gemini_schema(schema)),
                    }
                }),
            },
            ApiVersion::V1 => {
                // No system role here: fold it into the first user turn.
                if let Some(system) = &request.system {
                    match contents.iter_mut().find(|c| c.role == "user") {
                        Some(first) => {
                            if let Some(part) = first.parts.first_mut() {
                                part.text = format!("{system}\n\n{}", part.text);
                            }
                        }
                        None => contents.insert(
                            0,
                            Content {
                                role: "user".into(),
                                parts: vec![Part {
                                    text: system.clone(),
                                }],
                            },
                        ),
                    }
                }
                GenerateContentRequest {
                    system_instruction: None,
                    contents,
                    generation_config: None,
                }
            }
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[async_trait]
impl ModelBackend for GeminiBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let body = self.build_body(request);

        info!(
            strategy = %self.name,
            model = %self.model,
            json_output = request.wants_json(),
            "calling gemini generateContent"
        );

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("{} request failed", self.name))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(strategy = %self.name, status = %status, "gemini returned non-2xx");
            bail!("gemini {} returned {status}: {}", self.version.path(), truncate(&body));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .with_context(|| format!("failed to parse {} response", self.name))?;

        extract_text(parsed)
    }
}

fn extract_text(parsed: GenerateContentResponse) -> Result<String> {
    if let Some(reason) = parsed.prompt_feedback.and_then(|f| f.block_reason) {
        bail!("prompt blocked by provider: {reason}");
    }
    let Some(candidate) = parsed.candidates.into_iter().next() else {
        bail!("gemini returned no candidates");
    };
    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().map(|p| p.text).collect())
        .unwrap_or_default();
    if text.trim().is_empty() {
        bail!(
            "gemini candidate has no text (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        );
    }
    Ok(text)
}

/// Translate a JSON Schema into Gemini's OpenAPI-subset dialect: upper-case
/// type names, unsupported keywords dropped.
pub fn to_gemini_schema(schema: &Value) -> Value {
    let Some(obj) = schema.as_object() else {
        return schema.clone();
    };
    let mut out = Map::new();
    for (key, value) in obj {
        if !GEMINI_SCHEMA_KEYS.contains(&key.as_str()) {
            continue;
        }
        let converted = match key.as_str() {
            "type" => match value.as_str() {
                Some(t) => Value::String(t.to_ascii_uppercase()),
                None => continue,
            },
            "properties" => match value.as_object() {
                Some(props) => Value::Object(
                    props
                        .iter()
                        .map(|(k, v)| (k.clone(), to_gemini_schema(v)))
                        .collect(),
                ),
                None => continue,
            },
            "items" => to_gemini_schema(value),
            _ => value.clone(),
        };
        out.insert(key.clone(), converted);
    }
    Value::Object(out)
}

pub(crate) fn truncate(body: &str) -> String {
    if body.len() <= ERROR_BODY_LIMIT {
        return body.to_string();
    }
    let mut end = ERROR_BODY_LIMIT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
