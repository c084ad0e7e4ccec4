//! In-memory backend used by the use-case tests.

use async_trait::async_trait;
use contable_core::chat::{Capabilities, ChatReply, ChatRequest, HealthStatus};
use contable_core::feedback::{FeedbackReceipt, FeedbackSubmission};
use contable_core::service::{
    ByteProgress, ChatService, ContextService, FeedbackService, UploadService,
};
use contable_core::upload::{UploadResponse, UploadSource, UploadedFileInfo};
use contable_core::{ContableError, Result, SessionId, UserContext};
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedUpload {
    pub session_id: String,
    pub file_name: String,
    pub size: u64,
}

#[derive(Default)]
struct Inner {
    chat_replies: VecDeque<Result<ChatReply>>,
    chat_requests: Vec<ChatRequest>,
    contexts: VecDeque<Result<UserContext>>,
    context_sessions: Vec<String>,
    upload_replies: VecDeque<Result<UploadResponse>>,
    uploads: Vec<RecordedUpload>,
    feedback_replies: VecDeque<Result<FeedbackReceipt>>,
    feedback: Vec<FeedbackSubmission>,
    health_calls: usize,
}

/// Scripted backend. Replies are consumed in order; when a queue is empty
/// a benign default is returned.
#[derive(Default)]
pub struct MockBackend {
    inner: Mutex<Inner>,
    chat_gate: Mutex<Option<Arc<Notify>>>,
    healthy: Mutex<bool>,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        let backend = Self::default();
        *backend.healthy.lock().unwrap() = true;
        Arc::new(backend)
    }

    pub fn context(value: Value) -> UserContext {
        serde_json::from_value(value).unwrap()
    }

    /// Makes every chat call wait until the returned handle is notified.
    pub fn gate_chat(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.chat_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn set_healthy(&self, healthy: bool) {
        *self.healthy.lock().unwrap() = healthy;
    }

    pub fn push_chat(&self, reply: Result<ChatReply>) {
        self.inner.lock().unwrap().chat_replies.push_back(reply);
    }

    pub fn push_context(&self, context: Result<UserContext>) {
        self.inner.lock().unwrap().contexts.push_back(context);
    }

    pub fn push_upload(&self, reply: Result<UploadResponse>) {
        self.inner.lock().unwrap().upload_replies.push_back(reply);
    }

    pub fn push_feedback(&self, reply: Result<FeedbackReceipt>) {
        self.inner.lock().unwrap().feedback_replies.push_back(reply);
    }

    pub fn chat_requests(&self) -> Vec<ChatRequest> {
        self.inner.lock().unwrap().chat_requests.clone()
    }

    pub fn context_calls(&self) -> usize {
        self.inner.lock().unwrap().context_sessions.len()
    }

    pub fn context_sessions(&self) -> Vec<String> {
        self.inner.lock().unwrap().context_sessions.clone()
    }

    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.inner.lock().unwrap().uploads.clone()
    }

    pub fn feedback(&self) -> Vec<FeedbackSubmission> {
        self.inner.lock().unwrap().feedback.clone()
    }

    pub fn health_calls(&self) -> usize {
        self.inner.lock().unwrap().health_calls
    }
}

#[async_trait]
impl ChatService for MockBackend {
    async fn send_message(&self, request: &ChatRequest) -> Result<ChatReply> {
        self.inner
            .lock()
            .unwrap()
            .chat_requests
            .push(request.clone());

        let gate = self.chat_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        self.inner
            .lock()
            .unwrap()
            .chat_replies
            .pop_front()
            .unwrap_or_else(|| Ok(ChatReply::text("respuesta")))
    }

    async fn health(&self) -> Result<HealthStatus> {
        self.inner.lock().unwrap().health_calls += 1;
        if *self.healthy.lock().unwrap() {
            Ok(HealthStatus {
                status: "healthy".into(),
                service: Some("chat".into()),
                active_sessions: Some(1),
            })
        } else {
            Err(ContableError::transport("connection refused"))
        }
    }

    async fn capabilities(&self) -> Result<Capabilities> {
        Ok(Capabilities {
            system_name: Some("IA Contable".into()),
            version: Some("1.0.0".into()),
            capabilities: BTreeMap::new(),
        })
    }
}

#[async_trait]
impl ContextService for MockBackend {
    async fn fetch_user_context(&self, session_id: &SessionId) -> Result<UserContext> {
        let mut inner = self.inner.lock().unwrap();
        inner.context_sessions.push(session_id.to_string());
        inner
            .contexts
            .pop_front()
            .unwrap_or_else(|| Ok(UserContext::new()))
    }
}

#[async_trait]
impl UploadService for MockBackend {
    async fn upload_file(
        &self,
        session_id: &SessionId,
        source: UploadSource,
        progress: ByteProgress,
    ) -> Result<UploadResponse> {
        let size = source.size();
        progress(size / 2, size);
        progress(size, size);

        let mut inner = self.inner.lock().unwrap();
        inner.uploads.push(RecordedUpload {
            session_id: session_id.to_string(),
            file_name: source.file_name,
            size,
        });
        inner.upload_replies.pop_front().unwrap_or_else(|| {
            Ok(UploadResponse {
                success: true,
                is_duplicate: false,
                message: None,
            })
        })
    }

    async fn list_uploaded_files(&self, _session_id: &SessionId) -> Result<Vec<UploadedFileInfo>> {
        Ok(Vec::new())
    }
}

#[async_trait]
impl FeedbackService for MockBackend {
    async fn submit_feedback(&self, submission: &FeedbackSubmission) -> Result<FeedbackReceipt> {
        let mut inner = self.inner.lock().unwrap();
        inner.feedback.push(submission.clone());
        inner.feedback_replies.pop_front().unwrap_or_else(|| {
            Ok(FeedbackReceipt {
                success: true,
                message: "ok".into(),
                feedback_id: Some("fb-1".into()),
            })
        })
    }
}
