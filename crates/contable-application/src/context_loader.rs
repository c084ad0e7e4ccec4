//! Best-effort refresh of the server-side user context.

use contable_core::service::ContextService;
use std::sync::Arc;

use crate::state::AppState;

/// Fetches the user context and swaps it into [`AppState`].
///
/// Failures are logged and otherwise ignored: the previously displayed
/// context stays in place.
pub struct ContextLoader {
    service: Arc<dyn ContextService>,
    state: Arc<AppState>,
}

impl ContextLoader {
    pub fn new(service: Arc<dyn ContextService>, state: Arc<AppState>) -> Self {
        Self { service, state }
    }

    /// Returns `true` when the stored context was replaced.
    pub async fn refresh(&self) -> bool {
        match self.service.fetch_user_context(self.state.session_id()).await {
            Ok(context) => {
                tracing::debug!(entries = context.len(), "user context refreshed");
                self.state.replace_context(context).await;
                true
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to load user context");
                false
            }
        }
    }
}
