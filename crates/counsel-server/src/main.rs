use std::sync::Arc;

use counsel_core::config::Config;
use counsel_server::{app, AppState};
use tracing::{info, warn};

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "counsel_server=info,counsel_domains=info,counsel_agent=info,counsel_core=info,tower_http=debug"
            .into()
    });
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Config::from_env()?;
    info!(?config, "configuration loaded");

    let state = AppState::from_config(&config)?;
    if !state.legal.has_prediction_service() {
        warn!("PREDICTION_SERVICE_URL not set; predictions will use the language model only");
    }
    if state.legal.model_strategies().is_empty() {
        warn!("GEMINI_API_KEY not set; model fallback is disabled");
    }

    let app = app(Arc::new(state));

    let addr = config.listen_addr();
    info!("Listening on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
