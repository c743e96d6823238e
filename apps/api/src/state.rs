use std::sync::Arc;

use crate::config::Config;
use crate::feed::reddit::ContentProvider;
use crate::llm_client::Synthesizer;
use crate::store::RecordStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL in production; in-memory when `DATABASE_URL` is unset.
    pub store: Arc<dyn RecordStore>,
    pub synthesizer: Arc<dyn Synthesizer>,
    pub content: Arc<dyn ContentProvider>,
    pub config: Config,
}
