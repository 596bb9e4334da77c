use std::sync::Arc;

use crate::catalog::categories::CategoryCatalog;
use crate::catalog::store::CardStore;
use crate::chat::sessions::SessionLog;
use crate::config::Config;
use crate::llm_client::ChatModel;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Ordered spending categories; fixed for the process lifetime.
    pub categories: Arc<CategoryCatalog>,
    pub cards: Arc<CardStore>,
    /// Pluggable chat model. `LlmClient` in production, a stub in tests.
    pub llm: Arc<dyn ChatModel>,
    pub sessions: Arc<SessionLog>,
}

impl AppState {
    /// "provider/model" of the live chat model, as written to the session log.
    pub fn model_label(&self) -> String {
        format!("{}/{}", self.llm.provider(), self.llm.model())
    }
}
