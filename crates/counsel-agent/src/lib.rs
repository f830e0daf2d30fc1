pub mod gemini;
pub mod openai_compat;

use std::sync::Arc;

use counsel_core::{config::Config, model::ModelBackend};

pub use gemini::{ApiVersion, GeminiBackend};
pub use openai_compat::OpenAiCompatBackend;

/// The fallback strategies in the order they are tried: schema-constrained
/// native call, legacy native API, then the OpenAI-compatible REST endpoint
/// with JSON response format. Empty when no API key is configured.
pub fn default_strategies(config: &Config, http: reqwest::Client) -> Vec<Arc<dyn ModelBackend>> {
    if !config.has_model_credentials() {
        return Vec::new();
    }
    let key = config.gemini_api_key.as_str();
    let base = config.gemini_base_url.as_str();
    let model = config.gemini_model.as_str();
    vec![
        Arc::new(GeminiBackend::structured(key, model, http.clone()).with_base_url(base)),
        Arc::new(GeminiBackend::legacy(key, model, http.clone()).with_base_url(base)),
        Arc::new(OpenAiCompatBackend::gemini(key, model, http).with_base_url(base)),
    ]
}
