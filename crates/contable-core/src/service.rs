//! Service traits for the remote assistant.
//!
//! The client talks to one backend, split here by concern so each
//! use case depends only on the calls it makes. `contable-interaction`
//! provides the HTTP implementation; tests provide in-memory ones.

use async_trait::async_trait;
use std::sync::Arc;

use crate::chat::{Capabilities, ChatReply, ChatRequest, HealthStatus};
use crate::context::UserContext;
use crate::error::Result;
use crate::feedback::{FeedbackReceipt, FeedbackSubmission};
use crate::session::SessionId;
use crate::upload::{UploadResponse, UploadSource, UploadedFileInfo};

/// Callback receiving `(bytes_sent, bytes_total)` while an upload body streams.
pub type ByteProgress = Arc<dyn Fn(u64, u64) + Send + Sync>;

#[async_trait]
pub trait ChatService: Send + Sync {
    /// Sends one chat turn.
    ///
    /// Non-OK statuses map to [`ContableError::Transport`](crate::ContableError)
    /// and malformed bodies to `ResponseShape`.
    async fn send_message(&self, request: &ChatRequest) -> Result<ChatReply>;

    async fn health(&self) -> Result<HealthStatus>;

    async fn capabilities(&self) -> Result<Capabilities>;
}

#[async_trait]
pub trait ContextService: Send + Sync {
    /// Fetches the server's view of the user.
    ///
    /// An OK body without a `context` field is an empty context.
    async fn fetch_user_context(&self, session_id: &SessionId) -> Result<UserContext>;
}

#[async_trait]
pub trait UploadService: Send + Sync {
    /// Posts a file as multipart, reporting byte progress as the body streams.
    ///
    /// Returns the parsed body of an OK response. Non-OK statuses and
    /// unparseable bodies are errors.
    async fn upload_file(
        &self,
        session_id: &SessionId,
        source: UploadSource,
        progress: ByteProgress,
    ) -> Result<UploadResponse>;

    async fn list_uploaded_files(&self, session_id: &SessionId) -> Result<Vec<UploadedFileInfo>>;
}

#[async_trait]
pub trait FeedbackService: Send + Sync {
    async fn submit_feedback(&self, submission: &FeedbackSubmission) -> Result<FeedbackReceipt>;
}
