//! REST paths exposed by the assistant backend.

use contable_core::SessionId;

pub const CHAT_MESSAGE: &str = "/api/chat/message";
pub const CHAT_HEALTH: &str = "/api/chat/health";
pub const CHAT_CAPABILITIES: &str = "/api/chat/capabilities";
pub const UPLOAD_FILE: &str = "/api/upload/file";
pub const UPLOAD_FILES: &str = "/api/upload/files";
pub const FEEDBACK_SUBMIT: &str = "/api/feedback/submit";

/// `GET /api/user-context/{session_id}`. The token is used verbatim.
pub fn user_context(session_id: &SessionId) -> String {
    format!("/api/user-context/{session_id}")
}
