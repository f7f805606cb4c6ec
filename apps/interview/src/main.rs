mod config;
mod errors;
mod interview;
mod llm_client;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::interview::feedback::FeedbackTemplate;
use crate::interview::store::SessionStore;
use crate::llm_client::OpenAiClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first; a missing OPENAI_API_KEY stops startup here
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting interview simulator v{}", env!("CARGO_PKG_VERSION"));

    let llm = OpenAiClient::new(config.openai_api_key.clone(), &config.openai_base_url)
        .context("Failed to build LLM client")?;
    info!(
        "LLM client initialized (interview model: {}, feedback model: {})",
        config.interview_model, config.feedback_model
    );

    let feedback_template = match &config.feedback_template_path {
        Some(path) => {
            let template = FeedbackTemplate::load(path)?;
            info!("Feedback template loaded from {}", path.display());
            template
        }
        None => FeedbackTemplate::default(),
    };

    let state = AppState {
        sessions: SessionStore::new(config.session_ttl),
        llm: Arc::new(llm),
        config: config.clone(),
        feedback_template: Arc::new(feedback_template),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
