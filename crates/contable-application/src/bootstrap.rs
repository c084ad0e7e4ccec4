//! Wiring of the use cases around one backend and one session.

use contable_core::chat::{Capabilities, HealthStatus};
use contable_core::service::{ChatService, ContextService, FeedbackService, UploadService};
use contable_core::upload::UploadedFileInfo;
use contable_core::{ContableError, Result};
use std::sync::Arc;

use crate::chat_turn::ChatTurnController;
use crate::context_loader::ContextLoader;
use crate::feedback::FeedbackReporter;
use crate::state::AppState;
use crate::upload::UploadSubmitter;

/// What happened while the session was being set up.
#[derive(Debug)]
pub struct StartupReport {
    pub health: std::result::Result<HealthStatus, ContableError>,
    pub context_loaded: bool,
}

impl StartupReport {
    pub fn server_reachable(&self) -> bool {
        self.health.as_ref().is_ok_and(HealthStatus::is_healthy)
    }
}

/// One client session: state plus the use cases that act on it.
pub struct ContableApp {
    state: Arc<AppState>,
    chat_service: Arc<dyn ChatService>,
    upload_service: Arc<dyn UploadService>,
    context_loader: Arc<ContextLoader>,
    chat: Arc<ChatTurnController>,
    uploads: Arc<UploadSubmitter>,
    feedback: FeedbackReporter,
}

impl ContableApp {
    /// Builds a fresh session on top of a backend implementing every service.
    pub fn new<B>(backend: Arc<B>) -> Self
    where
        B: ChatService + ContextService + UploadService + FeedbackService + 'static,
    {
        Self::with_state(backend, Arc::new(AppState::new()))
    }

    pub fn with_state<B>(backend: Arc<B>, state: Arc<AppState>) -> Self
    where
        B: ChatService + ContextService + UploadService + FeedbackService + 'static,
    {
        let chat_service: Arc<dyn ChatService> = backend.clone();
        let upload_service: Arc<dyn UploadService> = backend.clone();
        let context_loader = Arc::new(ContextLoader::new(backend.clone(), state.clone()));
        let chat = Arc::new(ChatTurnController::new(
            chat_service.clone(),
            context_loader.clone(),
            state.clone(),
        ));
        let uploads = Arc::new(UploadSubmitter::new(upload_service.clone(), state.clone()));
        let feedback = FeedbackReporter::new(backend, state.clone());

        Self {
            state,
            chat_service,
            upload_service,
            context_loader,
            chat,
            uploads,
            feedback,
        }
    }

    /// Probes the server and performs the initial context load.
    ///
    /// Neither step is fatal; the report says what worked.
    pub async fn start(&self) -> StartupReport {
        tracing::info!(session_id = %self.state.session_id(), "session started");

        let health = self.chat_service.health().await;
        match &health {
            Ok(status) => tracing::info!(status = %status.status, "server health checked"),
            Err(err) => tracing::warn!(error = %err, "server health check failed"),
        }
        let context_loaded = self.context_loader.refresh().await;

        StartupReport {
            health,
            context_loaded,
        }
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    pub fn chat(&self) -> &Arc<ChatTurnController> {
        &self.chat
    }

    pub fn uploads(&self) -> &Arc<UploadSubmitter> {
        &self.uploads
    }

    pub fn feedback(&self) -> &FeedbackReporter {
        &self.feedback
    }

    pub fn context_loader(&self) -> &Arc<ContextLoader> {
        &self.context_loader
    }

    pub async fn capabilities(&self) -> Result<Capabilities> {
        self.chat_service.capabilities().await
    }

    pub async fn uploaded_files(&self) -> Result<Vec<UploadedFileInfo>> {
        self.upload_service
            .list_uploaded_files(self.state.session_id())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockBackend;
    use serde_json::json;

    #[tokio::test]
    async fn start_checks_health_and_loads_context() {
        let backend = MockBackend::new();
        backend.push_context(Ok(MockBackend::context(json!({"pais": "Chile"}))));
        let app = ContableApp::new(backend.clone());

        let report = app.start().await;

        assert!(report.server_reachable());
        assert!(report.context_loaded);
        assert_eq!(backend.health_calls(), 1);
        assert_eq!(
            backend.context_sessions(),
            vec![app.state().session_id().to_string()]
        );
        assert_eq!(app.state().context().await.get("pais"), Some(&json!("Chile")));
    }

    #[tokio::test]
    async fn unreachable_server_still_starts() {
        let backend = MockBackend::new();
        backend.set_healthy(false);
        backend.push_context(Err(ContableError::transport("connection refused")));
        let app = ContableApp::new(backend.clone());

        let report = app.start().await;

        assert!(!report.server_reachable());
        assert!(report.health.unwrap_err().is_transport());
        assert!(!report.context_loaded);
        assert!(app.state().context().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn use_cases_share_one_session() {
        let backend = MockBackend::new();
        let app = ContableApp::new(backend.clone());

        app.chat().send_turn("hola").await.unwrap();
        app.uploads()
            .submit(contable_core::upload::UploadSource::new("a.csv", b"1,2".to_vec()))
            .await
            .unwrap();

        let session = app.state().session_id().clone();
        assert_eq!(backend.chat_requests()[0].session_id, session);
        assert_eq!(backend.uploads()[0].session_id, session.to_string());
        assert_eq!(backend.context_sessions(), vec![session.to_string()]);
    }

    #[tokio::test]
    async fn capabilities_and_files_are_delegated() {
        let backend = MockBackend::new();
        let app = ContableApp::new(backend);

        let capabilities = app.capabilities().await.unwrap();
        assert_eq!(capabilities.system_name.as_deref(), Some("IA Contable"));
        assert!(app.uploaded_files().await.unwrap().is_empty());
    }
}
