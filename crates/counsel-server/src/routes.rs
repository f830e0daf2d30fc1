use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    response::Json,
};
use counsel_core::{ChatTurn, ContractAnalysis, PredictionEnvelope};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{error::ApiError, AppState};

// ── Request body types ────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(crate) struct PredictBody {
    pub case: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct AnalyzeBody {
    pub contract: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct ChatBody {
    #[serde(default)]
    pub messages: Vec<ChatTurn>,
}

// ── Response body types ───────────────────────────────────────────────────

#[derive(Serialize)]
pub(crate) struct AnalyzeResponse {
    pub analysis: ContractAnalysis,
}

#[derive(Serialize)]
pub(crate) struct ChatResponse {
    pub reply: String,
}

// ── Handlers ──────────────────────────────────────────────────────────────

pub(crate) async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_s": state.start_time.elapsed().as_secs(),
        "started_at": state.started_at.to_rfc3339(),
        "prediction_service": state.legal.has_prediction_service(),
        "model_strategies": state.legal.model_strategies(),
    }))
}

pub(crate) async fn predict(
    State(state): State<Arc<AppState>>,
    body: Result<Json<PredictBody>, JsonRejection>,
) -> Result<Json<PredictionEnvelope>, ApiError> {
    let Json(body) = body?;
    let envelope = state.legal.predict_case(body.case.as_deref()).await?;
    Ok(Json(envelope))
}

pub(crate) async fn analyze(
    State(state): State<Arc<AppState>>,
    body: Result<Json<AnalyzeBody>, JsonRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let Json(body) = body?;
    let analysis = state.legal.analyze_contract(body.contract.as_deref()).await?;
    Ok(Json(AnalyzeResponse { analysis }))
}

pub(crate) async fn chat(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ChatBody>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(body) = body?;
    let reply = state.legal.research_chat(&body.messages).await?;
    Ok(Json(ChatResponse { reply }))
}
