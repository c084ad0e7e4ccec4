//! Chat endpoint payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::context::UserContext;
use crate::message::ChatMessage;
use crate::session::SessionId;

/// Body of `POST /api/chat/message`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub session_id: SessionId,
    pub user_context: UserContext,
    pub history: Vec<ChatMessage>,
}

/// Successful answer from the chat endpoint.
///
/// Only `response` is required. The remaining fields are metadata the
/// server attaches to its classification of the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: Value,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub query_type: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub processing_time: Option<f64>,
}

impl ChatReply {
    pub fn text(response: impl Into<String>) -> Self {
        Self {
            response: Value::String(response.into()),
            session_id: None,
            query_type: None,
            confidence: None,
            processing_time: None,
        }
    }

    /// An absent, null or empty `response` carries no answer.
    pub fn has_response(&self) -> bool {
        match &self.response {
            Value::Null => false,
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }
}

/// Body of `GET /api/chat/health`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub active_sessions: Option<u64>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy")
    }
}

/// One capability advertised by `GET /api/chat/capabilities`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capability {
    pub description: String,
    #[serde(default)]
    pub examples: Vec<String>,
}

/// Body of `GET /api/chat/capabilities`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capabilities {
    #[serde(default)]
    pub system_name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub capabilities: BTreeMap<String, Capability>,
}
