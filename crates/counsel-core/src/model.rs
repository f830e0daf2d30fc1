use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use crate::{
    error::{CounselError, StrategyFailure},
    schema::ResponseSchema,
    types::ChatTurn,
};

/// One call to a language model.
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    pub system: Option<String>,
    pub turns: Vec<ChatTurn>,
    /// JSON schema the output must follow. `None` = free text.
    pub response_schema: Option<Value>,
}

impl GenerationRequest {
    pub fn prompt(text: impl Into<String>) -> Self {
        Self {
            turns: vec![ChatTurn::user(text)],
            ..Default::default()
        }
    }

    pub fn conversation(turns: Vec<ChatTurn>) -> Self {
        Self {
            turns,
            ..Default::default()
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.response_schema = Some(schema);
        self
    }

    pub fn wants_json(&self) -> bool {
        self.response_schema.is_some()
    }
}

/// A way of reaching a language model. Each implementation is one strategy.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Short identifier used in logs and error reports.
    fn name(&self) -> &str;

    /// Returns the raw text of the model's first candidate.
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;
}

/// Ordered list of strategies. The first one that produces usable output wins;
/// each strategy is attempted at most once per call.
#[derive(Clone, Default)]
pub struct ModelChain {
    backends: Vec<Arc<dyn ModelBackend>>,
}

impl ModelChain {
    pub fn new(backends: Vec<Arc<dyn ModelBackend>>) -> Self {
        Self { backends }
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    pub fn strategy_names(&self) -> Vec<String> {
        self.backends.iter().map(|b| b.name().to_string()).collect()
    }

    /// Run strategies until one returns JSON that passes `schema`.
    pub async fn generate_json(
        &self,
        request: &GenerationRequest,
        schema: &ResponseSchema,
    ) -> Result<Value, CounselError> {
        if self.backends.is_empty() {
            return Err(CounselError::MissingCredentials);
        }
        let mut failures = Vec::with_capacity(self.backends.len());
        for backend in &self.backends {
            let outcome = match backend.generate(request).await {
                Ok(text) => parse_model_json(&text).and_then(|v| schema.validate(&v).map(|_| v)),
                Err(e) => Err(CounselError::Upstream(format!("{e:#}"))),
            };
            match outcome {
                Ok(value) => {
                    info!(
                        strategy = backend.name(),
                        schema = schema.name(),
                        "model strategy succeeded"
                    );
                    return Ok(value);
                }
                Err(e) => {
                    warn!(
                        strategy = backend.name(),
                        schema = schema.name(),
                        "model strategy failed: {e}"
                    );
                    failures.push(StrategyFailure::new(backend.name(), e));
                }
            }
        }
        Err(CounselError::StrategiesExhausted(failures))
    }

    /// Run strategies until one returns non-empty text.
    pub async fn generate_text(&self, request: &GenerationRequest) -> Result<String, CounselError> {
        if self.backends.is_empty() {
            return Err(CounselError::MissingCredentials);
        }
        let mut failures = Vec::with_capacity(self.backends.len());
        for backend in &self.backends {
            match backend.generate(request).await {
                Ok(text) if !text.trim().is_empty() => {
                    info!(
                        strategy = backend.name(),
                        output_len = text.len(),
                        "model strategy succeeded"
                    );
                    return Ok(text.trim().to_string());
                }
                Ok(_) => {
                    warn!(strategy = backend.name(), "model strategy returned empty text");
                    let error = CounselError::Upstream("empty response".into());
                    failures.push(StrategyFailure::new(backend.name(), error));
                }
                Err(e) => {
                    warn!(strategy = backend.name(), "model strategy failed: {e:#}");
                    let error = CounselError::Upstream(format!("{e:#}"));
                    failures.push(StrategyFailure::new(backend.name(), error));
                }
            }
        }
        Err(CounselError::StrategiesExhausted(failures))
    }
}

/// Parse model output as JSON, tolerating markdown code fences and prose
/// around a single top-level object.
pub fn parse_model_json(text: &str) -> Result<Value, CounselError> {
    let trimmed = strip_code_fence(text.trim());
    if let Ok(v) = serde_json::from_str::<Value>(trimmed) {
        return Ok(v);
    }
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => serde_json::from_str(&trimmed[start..=end])
            .map_err(|e| CounselError::Parse(e.to_string())),
        _ => Err(CounselError::Parse(format!(
            "no JSON object in {} bytes of output",
            text.len()
        ))),
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string ("json") on the opening fence line.
    let body = rest.split_once('\n').map(|(_, b)| b).unwrap_or(rest);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}
