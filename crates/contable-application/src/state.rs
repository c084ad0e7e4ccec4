//! Per-run application state.

use contable_core::{ChatMessage, MessageThread, SessionId, UploadMode, UserContext};
use contable_execution::ProgressRunner;
use std::time::Duration;
use tokio::sync::RwLock;

/// Metadata of the last answered turn, kept for feedback submissions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplyMetadata {
    pub query_type: Option<String>,
    pub confidence: Option<f64>,
    /// Server-reported processing time in seconds.
    pub processing_time: Option<f64>,
    /// Round trip measured by the client.
    pub elapsed: Duration,
}

/// Everything the client knows for the lifetime of one run.
///
/// The session id is fixed at construction. The thread only grows. The
/// context is replaced wholesale on every successful fetch.
pub struct AppState {
    session_id: SessionId,
    thread: RwLock<MessageThread>,
    context: RwLock<UserContext>,
    draft: RwLock<String>,
    upload_mode: RwLock<UploadMode>,
    last_reply: RwLock<Option<ReplyMetadata>>,
    progress: ProgressRunner,
}

impl AppState {
    /// Creates state for a fresh session.
    pub fn new() -> Self {
        Self::with_session(SessionId::generate())
    }

    pub fn with_session(session_id: SessionId) -> Self {
        Self {
            session_id,
            thread: RwLock::new(MessageThread::new()),
            context: RwLock::new(UserContext::new()),
            draft: RwLock::new(String::new()),
            upload_mode: RwLock::new(UploadMode::default()),
            last_reply: RwLock::new(None),
            progress: ProgressRunner::new(),
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn progress(&self) -> &ProgressRunner {
        &self.progress
    }

    pub async fn messages(&self) -> Vec<ChatMessage> {
        self.thread.read().await.messages().to_vec()
    }

    pub async fn message_count(&self) -> usize {
        self.thread.read().await.len()
    }

    pub(crate) fn thread(&self) -> &RwLock<MessageThread> {
        &self.thread
    }

    pub async fn context(&self) -> UserContext {
        self.context.read().await.clone()
    }

    pub(crate) async fn replace_context(&self, context: UserContext) {
        *self.context.write().await = context;
    }

    /// Text kept in the compose line. Cleared only after a successful turn.
    pub async fn draft(&self) -> String {
        self.draft.read().await.clone()
    }

    pub(crate) async fn set_draft(&self, text: impl Into<String>) {
        *self.draft.write().await = text.into();
    }

    pub async fn upload_mode(&self) -> UploadMode {
        *self.upload_mode.read().await
    }

    pub async fn set_upload_mode(&self, mode: UploadMode) {
        *self.upload_mode.write().await = mode;
    }

    pub async fn last_reply(&self) -> Option<ReplyMetadata> {
        self.last_reply.read().await.clone()
    }

    pub(crate) async fn set_last_reply(&self, metadata: ReplyMetadata) {
        *self.last_reply.write().await = Some(metadata);
    }

    pub(crate) async fn clear_last_reply(&self) {
        *self.last_reply.write().await = None;
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
