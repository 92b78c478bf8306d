//! Application state shared across all request handlers.

use std::sync::Arc;
use topic_sync::SyncOrchestrator;

use crate::auth::TokenVerifier;

/// Application state shared across all handlers.
///
/// Cloned per request; the inner resources sit behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Sync engine wired to the forum, roster and linkage backends
    pub orchestrator: Arc<SyncOrchestrator>,

    /// Caller token verification
    pub verifier: Arc<TokenVerifier>,
}

impl AppState {
    #[must_use]
    pub fn new(orchestrator: SyncOrchestrator, verifier: TokenVerifier) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            verifier: Arc::new(verifier),
        }
    }
}
