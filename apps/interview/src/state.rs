use std::sync::Arc;

use crate::config::Config;
use crate::interview::feedback::FeedbackTemplate;
use crate::interview::store::SessionStore;
use crate::llm_client::ChatProvider;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionStore,
    /// Provider backend. Default: OpenAiClient.
    pub llm: Arc<dyn ChatProvider>,
    pub config: Config,
    pub feedback_template: Arc<FeedbackTemplate>,
}
