use std::sync::Arc;

use crate::assistant::Assistant;
use crate::extraction::orchestrator::Orchestrator;
use crate::llm_client::Credential;
use crate::preferences::PreferencesState;
use crate::review::ReviewRegistry;
use crate::store::KeyValueStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub assistant: Assistant,
    pub reviews: ReviewRegistry,
    /// Redis when configured, otherwise process memory.
    pub store: Arc<dyn KeyValueStore>,
    pub preferences: PreferencesState,
    /// Shared with both LLM clients; updated by the settings endpoints.
    pub credential: Credential,
}
