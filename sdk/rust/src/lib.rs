//! Typed client for the Counsel HTTP API.
//!
//! ```no_run
//! # async fn run() -> Result<(), counsel_sdk::SdkError> {
//! let client = counsel_sdk::CounselClient::new("http://localhost:3001");
//! let prediction = client.predict("Tenant withheld rent over repairs.").await?;
//! println!("{}%", prediction.probability);
//! # Ok(())
//! # }
//! ```

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

// ── Errors ────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response. `message` is the server's `error` field when present.
    #[error("api returned {status}: {message}")]
    Api { status: u16, message: String },
}

impl SdkError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
        }
    }
}

pub type Result<T> = std::result::Result<T, SdkError>;

// ── Wire types ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RelatedRecord {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub snippet: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Prediction {
    pub probability: f64,
    pub timeline: String,
    pub feature_points: Vec<String>,
    pub related_records: Vec<RelatedRecord>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ContractRisk {
    pub clause: String,
    pub severity: String,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ContractAnalysis {
    pub summary: String,
    pub risk_level: String,
    pub risks: Vec<ContractRisk>,
    pub key_terms: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
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

#[derive(Debug, Clone, Deserialize)]
pub struct Health {
    pub status: String,
    pub version: String,
    pub uptime_s: u64,
    #[serde(default)]
    pub prediction_service: bool,
    #[serde(default)]
    pub model_strategies: Vec<String>,
}

#[derive(Deserialize)]
struct PredictionEnvelope {
    prediction: Prediction,
}

#[derive(Deserialize)]
struct AnalyzeEnvelope {
    analysis: ContractAnalysis,
}

#[derive(Deserialize)]
struct ChatEnvelope {
    reply: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

// ── Client ────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct CounselClient {
    base_url: String,
    http: reqwest::Client,
}

impl CounselClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, http }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health(&self) -> Result<Health> {
        let resp = self.http.get(format!("{}/health", self.base_url)).send().await?;
        decode(resp).await
    }

    pub async fn predict(&self, case: &str) -> Result<Prediction> {
        let envelope: PredictionEnvelope =
            self.post("/predict", &serde_json::json!({ "case": case })).await?;
        Ok(envelope.prediction)
    }

    pub async fn analyze(&self, contract: &str) -> Result<ContractAnalysis> {
        let envelope: AnalyzeEnvelope =
            self.post("/analyze", &serde_json::json!({ "contract": contract })).await?;
        Ok(envelope.analysis)
    }

    pub async fn chat(&self, messages: &[Message]) -> Result<String> {
        let envelope: ChatEnvelope =
            self.post("/chat", &serde_json::json!({ "messages": messages })).await?;
        Ok(envelope.reply)
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let resp = self
            .http
            .post(format!("{}{path}", self.base_url))
            .json(body)
            .send()
            .await?;
        decode(resp).await
    }
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp.json().await?);
    }
    let text = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|b| b.error)
        .unwrap_or(text);
    Err(SdkError::Api {
        status: status.as_u16(),
        message,
    })
}
