pub mod error;
pub mod routes;

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use counsel_core::{config::Config, model::ModelChain};
use counsel_domains::legal::{LegalAssistant, PredictionServiceClient};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

// ── AppState ──────────────────────────────────────────────────────────────

/// Shared, read-only state. Nothing in here changes after startup.
pub struct AppState {
    pub legal: LegalAssistant,
    pub start_time: Instant,
    pub started_at: DateTime<Utc>,
    pub cors_permissive: bool,
}

impl AppState {
    pub fn new(legal: LegalAssistant) -> Self {
        Self {
            legal,
            start_time: Instant::now(),
            started_at: Utc::now(),
            cors_permissive: true,
        }
    }

    /// Wire the prediction service and model strategies described by `config`.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder();
        if config.http_timeout_s > 0 {
            builder = builder.timeout(Duration::from_secs(config.http_timeout_s));
        }
        let http = builder.build()?;

        let service = config.has_prediction_service().then(|| {
            PredictionServiceClient::new(&config.prediction_service_url, http.clone())
                .with_token(&config.prediction_service_token)
        });
        let models = ModelChain::new(counsel_agent::default_strategies(config, http));
        let legal = LegalAssistant::new(service, models)?
            .with_max_contract_chars(config.max_contract_chars);

        Ok(Self {
            cors_permissive: config.cors_permissive,
            ..Self::new(legal)
        })
    }
}

// ── Router ────────────────────────────────────────────────────────────────

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(routes::health))
        .route("/predict", post(routes::predict))
        .route("/analyze", post(routes::analyze))
        .route("/chat", post(routes::chat))
}

/// Every endpoint is served both at the root and under `/api`.
pub fn app(state: Arc<AppState>) -> Router {
    let cors = state.cors_permissive;
    let router = Router::new()
        .merge(api_routes())
        .nest("/api", api_routes())
        .layer(TraceLayer::new_for_http());
    let router = if cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    };
    router.with_state(state)
}
