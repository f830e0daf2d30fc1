use std::sync::{Arc, Mutex};

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode, Uri},
    Json, Router,
};
use counsel_agent::{default_strategies, gemini::to_gemini_schema, GeminiBackend, OpenAiCompatBackend};
use counsel_core::{
    config::Config,
    error::looks_like_network_error,
    model::{GenerationRequest, ModelBackend},
    schema::prediction_schema,
    types::ChatTurn,
};
use serde_json::{json, Value};
use tracing_test::traced_test;

// ── Stub provider ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Call {
    path: String,
    headers: HeaderMap,
    body: Value,
}

#[derive(Clone)]
struct StubState {
    status: StatusCode,
    reply: Value,
    calls: Arc<Mutex<Vec<Call>>>,
}

async fn record(
    State(state): State<StubState>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.calls.lock().unwrap().push(Call {
        path: uri.path().to_string(),
        headers,
        body,
    });
    (state.status, Json(state.reply.clone()))
}

async fn spawn_stub(status: StatusCode, reply: Value) -> (String, Arc<Mutex<Vec<Call>>>) {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new().fallback(record).with_state(StubState {
        status,
        reply,
        calls: Arc::clone(&calls),
    });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), calls)
}

/// An address nothing is listening on.
async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

fn gemini_reply(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }]
    })
}

fn json_request() -> GenerationRequest {
    GenerationRequest::prompt("Estimate this case.")
        .with_system("You are a legal analyst.")
        .with_schema(prediction_schema())
}

// =============================================================================
// Gemini structured
// =============================================================================

#[tokio::test]
async fn test_structured_sends_schema_and_system_instruction() {
    let (url, calls) = spawn_stub(StatusCode::OK, gemini_reply("{\"ok\":true}")).await;
    let backend = GeminiBackend::structured("k-123", "gemini-test", reqwest::Client::new()).with_base_url(&url);

    let text = backend.generate(&json_request()).await.unwrap();
    assert_eq!(text, "{\"ok\":true}");

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    let call = &calls[0];
    assert_eq!(call.path, "/v1beta/models/gemini-test:generateContent");
    assert_eq!(call.headers.get("x-goog-api-key").unwrap(), "k-123");
    assert_eq!(
        call.body["systemInstruction"]["parts"][0]["text"],
        json!("You are a legal analyst.")
    );
    assert_eq!(call.body["contents"][0]["role"], json!("user"));
    assert_eq!(
        call.body["generationConfig"]["responseMimeType"],
        json!("application/json")
    );
    assert_eq!(
        call.body["generationConfig"]["responseSchema"]["type"],
        json!("OBJECT")
    );
}

#[tokio::test]
async fn test_structured_joins_multiple_parts() {
    let reply = json!({
        "candidates": [{ "content": { "parts": [{ "text": "{\"a\":" }, { "text": "1}" }] } }]
    });
    let (url, _) = spawn_stub(StatusCode::OK, reply).await;
    let backend = GeminiBackend::structured("k", "m", reqwest::Client::new()).with_base_url(&url);
    assert_eq!(backend.generate(&json_request()).await.unwrap(), "{\"a\":1}");
}

#[tokio::test]
async fn test_plain_text_request_has_no_generation_config() {
    let (url, calls) = spawn_stub(StatusCode::OK, gemini_reply("hello")).await;
    let backend = GeminiBackend::structured("k", "m", reqwest::Client::new()).with_base_url(&url);
    backend
        .generate(&GenerationRequest::conversation(vec![
            ChatTurn::user("Hi"),
            ChatTurn::assistant("Hello, how can I help?"),
            ChatTurn::user("What is tort law?"),
        ]))
        .await
        .unwrap();
    let calls = calls.lock().unwrap();
    let body = &calls[0].body;
    assert!(body.get("generationConfig").is_none());
    assert_eq!(body["contents"][1]["role"], json!("model"));
    assert_eq!(body["contents"].as_array().unwrap().len(), 3);
}

#[tokio::test]
#[traced_test]
async fn test_non_success_status_is_an_error() {
    let (url, _) = spawn_stub(
        StatusCode::FORBIDDEN,
        json!({ "error": { "message": "API key not valid" } }),
    )
    .await;
    let backend = GeminiBackend::structured("bad", "m", reqwest::Client::new()).with_base_url(&url);
    let err = backend.generate(&json_request()).await.unwrap_err();
    let msg = format!("{err:#}");
    assert!(msg.contains("403"), "{msg}");
    assert!(msg.contains("API key not valid"), "{msg}");
    assert!(logs_contain("gemini returned non-2xx"));
    assert!(logs_contain("403"));
}

#[tokio::test]
async fn test_blocked_prompt_is_an_error() {
    let (url, _) = spawn_stub(
        StatusCode::OK,
        json!({ "candidates": [], "promptFeedback": { "blockReason": "SAFETY" } }),
    )
    .await;
    let backend = GeminiBackend::structured("k", "m", reqwest::Client::new()).with_base_url(&url);
    let err = backend.generate(&json_request()).await.unwrap_err();
    assert!(err.to_string().contains("SAFETY"));
}

#[tokio::test]
async fn test_connection_refused_reads_as_network_error() {
    let url = closed_port_url().await;
    let backend = GeminiBackend::structured("k", "m", reqwest::Client::new()).with_base_url(&url);
    let err = backend.generate(&json_request()).await.unwrap_err();
    assert!(looks_like_network_error(&format!("{err:#}")), "{err:#}");
}

// =============================================================================
// Gemini legacy
// =============================================================================

#[tokio::test]
async fn test_legacy_uses_v1_and_folds_system_prompt() {
    let (url, calls) = spawn_stub(StatusCode::OK, gemini_reply("{}")).await;
    let backend = GeminiBackend::legacy("k", "gemini-test", reqwest::Client::new()).with_base_url(&url);
    backend.generate(&json_request()).await.unwrap();

    let calls = calls.lock().unwrap();
    let call = &calls[0];
    assert_eq!(call.path, "/v1/models/gemini-test:generateContent");
    assert!(call.body.get("systemInstruction").is_none());
    assert!(call.body.get("generationConfig").is_none());
    let first = call.body["contents"][0]["parts"][0]["text"].as_str().unwrap();
    assert!(first.starts_with("You are a legal analyst."));
    assert!(first.ends_with("Estimate this case."));
}

// =============================================================================
// OpenAI-compatible
// =============================================================================

#[tokio::test]
async fn test_openai_compat_forces_json_object() {
    let reply = json!({
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": "{\"x\":1}" } }]
    });
    let (url, calls) = spawn_stub(StatusCode::OK, reply).await;
    let backend = OpenAiCompatBackend::gemini("k-9", "gemini-test", reqwest::Client::new()).with_base_url(&url);

    assert_eq!(backend.generate(&json_request()).await.unwrap(), "{\"x\":1}");

    let calls = calls.lock().unwrap();
    let call = &calls[0];
    assert_eq!(call.path, "/v1beta/openai/chat/completions");
    assert_eq!(call.headers.get("authorization").unwrap(), "Bearer k-9");
    assert_eq!(call.body["response_format"]["type"], json!("json_object"));
    assert_eq!(call.body["model"], json!("gemini-test"));
    assert_eq!(call.body["messages"][0]["role"], json!("system"));
    assert_eq!(call.body["messages"][1]["role"], json!("user"));
}

#[tokio::test]
async fn test_openai_compat_text_mode_omits_response_format() {
    let reply = json!({ "choices": [{ "message": { "role": "assistant", "content": "Answer." } }] });
    let (url, calls) = spawn_stub(StatusCode::OK, reply).await;
    let backend = OpenAiCompatBackend::gemini("k", "m", reqwest::Client::new()).with_base_url(&url);
    backend.generate(&GenerationRequest::prompt("q")).await.unwrap();
    assert!(calls.lock().unwrap()[0].body.get("response_format").is_none());
}

#[tokio::test]
async fn test_openai_compat_empty_choices_is_an_error() {
    let (url, _) = spawn_stub(StatusCode::OK, json!({ "choices": [] })).await;
    let backend = OpenAiCompatBackend::gemini("k", "m", reqwest::Client::new()).with_base_url(&url);
    assert!(backend.generate(&json_request()).await.is_err());
}

// =============================================================================
// Schema translation and strategy list
// =============================================================================

#[test]
fn test_gemini_schema_translation() {
    let converted = to_gemini_schema(&prediction_schema());
    assert!(converted.get("$schema").is_none());
    assert_eq!(converted["type"], json!("OBJECT"));
    let prediction = &converted["properties"]["prediction"];
    assert_eq!(prediction["properties"]["probability"]["type"], json!("NUMBER"));
    assert_eq!(prediction["properties"]["probability"]["maximum"], json!(100));
    assert_eq!(prediction["properties"]["feature_points"]["items"]["type"], json!("STRING"));
    let url = &prediction["properties"]["related_records"]["items"]["properties"]["url"];
    assert!(url.get("format").is_none());
    assert_eq!(url["type"], json!("STRING"));
}

#[test]
fn test_default_strategies_order() {
    let mut config = Config::default();
    assert!(default_strategies(&config, reqwest::Client::new()).is_empty());

    config.gemini_api_key = "k".into();
    let names: Vec<String> = default_strategies(&config, reqwest::Client::new())
        .iter()
        .map(|b| b.name().to_string())
        .collect();
    assert_eq!(names, ["gemini-structured", "gemini-legacy", "openai-compat-json"]);
}
