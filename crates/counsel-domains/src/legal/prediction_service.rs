use anyhow::{bail, Context, Result};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

/// Client for the external case-outcome prediction microservice.
pub struct PredictionServiceClient {
    url: String,
    token: Option<String>,
    http: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    case: &'a str,
}

/// What a 2xx from the service turned out to contain.
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceResponse {
    /// A JSON body with prediction data; authoritative.
    Prediction(Value),
    /// A 2xx that carries nothing usable.
    NoData(String),
}

impl PredictionServiceClient {
    pub fn new(url: &str, http: reqwest::Client) -> Self {
        Self {
            url: url.to_string(),
            token: None,
            http,
        }
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.token = (!token.is_empty()).then(|| token.to_string());
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// One attempt, no retry. Transport failures and non-2xx statuses are errors.
    pub async fn predict(&self, case_text: &str) -> Result<ServiceResponse> {
        let mut req = self
            .http
            .post(&self.url)
            .json(&PredictRequest { case: case_text });
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let resp = req
            .send()
            .await
            .context("prediction service request failed")?;
        let status = resp.status();
        if !status.is_success() {
            bail!("prediction service returned {status}");
        }

        let body = resp
            .text()
            .await
            .context("failed to read prediction service response")?;
        info!(status = %status, body_len = body.len(), "prediction service responded");

        let Ok(value) = serde_json::from_str::<Value>(&body) else {
            return Ok(ServiceResponse::NoData("response body is not JSON".into()));
        };
        if !counsel_core::normalize::has_prediction_data(&value) {
            return Ok(ServiceResponse::NoData(
                "response has no prediction fields".into(),
            ));
        }
        Ok(ServiceResponse::Prediction(value))
    }
}
