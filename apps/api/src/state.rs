use std::sync::Arc;

use crate::chat::ChatResolver;
use crate::config::Config;
use crate::extraction::PlaceholderDescriber;
use crate::session::SessionStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Pluggable session backend. Default: InMemorySessionStore.
    pub sessions: Arc<dyn SessionStore>,
    /// Placeholder enrichment. LLM-backed when ANTHROPIC_API_KEY is set, heuristic otherwise.
    pub describer: Arc<dyn PlaceholderDescriber>,
    /// Chat turn resolver. LLM-backed when ANTHROPIC_API_KEY is set, keyword otherwise.
    pub resolver: Arc<dyn ChatResolver>,
}
