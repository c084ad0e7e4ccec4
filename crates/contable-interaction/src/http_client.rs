//! HttpAssistantClient - REST client for the accounting-assistant backend.
//!
//! One `reqwest::Client` serves every endpoint. Non-OK statuses become
//! transport errors carrying the server's `detail` text when it sends one;
//! bodies that do not parse become response-shape errors.

use async_trait::async_trait;
use contable_core::chat::{Capabilities, ChatReply, ChatRequest, HealthStatus};
use contable_core::config::ServerSettings;
use contable_core::feedback::{FeedbackReceipt, FeedbackSubmission};
use contable_core::service::{
    ByteProgress, ChatService, ContextService, FeedbackService, UploadService,
};
use contable_core::upload::{UploadResponse, UploadSource, UploadedFileInfo};
use contable_core::{ContableError, Result, SessionId, UserContext};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::endpoints;

/// Size of each slice handed to the transport while streaming an upload.
/// Byte progress is reported once per slice.
const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// HTTP implementation of every backend service trait.
#[derive(Clone, Debug)]
pub struct HttpAssistantClient {
    client: Client,
    base_url: String,
}

impl HttpAssistantClient {
    /// Creates a client with no request timeout.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, None)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|err| ContableError::config(format!("Failed to build HTTP client: {err}")))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ContableError::config("server base URL is empty"));
        }

        Ok(Self { client, base_url })
    }

    pub fn from_settings(settings: &ServerSettings) -> Result<Self> {
        Self::with_timeout(settings.base_url.clone(), settings.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| request_failed(url, err))?;
        read_json(response).await
    }
}

#[async_trait]
impl ChatService for HttpAssistantClient {
    async fn send_message(&self, request: &ChatRequest) -> Result<ChatReply> {
        let url = self.url(endpoints::CHAT_MESSAGE);
        tracing::debug!(
            session_id = %request.session_id,
            history_len = request.history.len(),
            "POST chat message"
        );

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|err| request_failed(&url, err))?;

        read_json(response).await
    }

    async fn health(&self) -> Result<HealthStatus> {
        self.get_json(&self.url(endpoints::CHAT_HEALTH)).await
    }

    async fn capabilities(&self) -> Result<Capabilities> {
        self.get_json(&self.url(endpoints::CHAT_CAPABILITIES)).await
    }
}

#[derive(Deserialize)]
struct UserContextResponse {
    #[serde(default)]
    context: Option<UserContext>,
}

#[async_trait]
impl ContextService for HttpAssistantClient {
    async fn fetch_user_context(&self, session_id: &SessionId) -> Result<UserContext> {
        let url = self.url(&endpoints::user_context(session_id));
        let body: UserContextResponse = self.get_json(&url).await?;
        Ok(body.context.unwrap_or_default())
    }
}

#[async_trait]
impl UploadService for HttpAssistantClient {
    async fn upload_file(
        &self,
        session_id: &SessionId,
        source: UploadSource,
        progress: ByteProgress,
    ) -> Result<UploadResponse> {
        let url = self.url(endpoints::UPLOAD_FILE);
        let total = source.size();
        let mime = mime_guess::from_path(&source.file_name).first_or_octet_stream();
        let file_name = source.file_name.clone();

        tracing::debug!(%file_name, total, mime = %mime, "POST upload");

        let chunks: Vec<Vec<u8>> = source
            .bytes
            .chunks(UPLOAD_CHUNK_SIZE)
            .map(|chunk| chunk.to_vec())
            .collect();
        let mut sent = 0u64;
        let stream = futures::stream::iter(chunks.into_iter().map(move |chunk| {
            sent += chunk.len() as u64;
            progress(sent, total);
            Ok::<Vec<u8>, std::io::Error>(chunk)
        }));

        let part = Part::stream_with_length(Body::wrap_stream(stream), total)
            .file_name(file_name)
            .mime_str(mime.as_ref())
            .map_err(|err| ContableError::internal(format!("invalid MIME type: {err}")))?;
        let form = Form::new()
            .part("file", part)
            .text("user_id", session_id.to_string());

        let response = self
            .client
            .post(&url)
            .query(&[("session_id", session_id.as_str())])
            .multipart(form)
            .send()
            .await
            .map_err(|err| request_failed(&url, err))?;

        read_json(response).await
    }

    async fn list_uploaded_files(&self, session_id: &SessionId) -> Result<Vec<UploadedFileInfo>> {
        let url = self.url(endpoints::UPLOAD_FILES);
        let response = self
            .client
            .get(&url)
            .query(&[("user_id", session_id.as_str())])
            .send()
            .await
            .map_err(|err| request_failed(&url, err))?;
        read_json(response).await
    }
}

#[async_trait]
impl FeedbackService for HttpAssistantClient {
    async fn submit_feedback(&self, submission: &FeedbackSubmission) -> Result<FeedbackReceipt> {
        let url = self.url(endpoints::FEEDBACK_SUBMIT);
        let response = self
            .client
            .post(&url)
            .json(submission)
            .send()
            .await
            .map_err(|err| request_failed(&url, err))?;
        read_json(response).await
    }
}

#[derive(Deserialize)]
struct ErrorResponse {
    detail: serde_json::Value,
}

fn request_failed(url: &str, err: reqwest::Error) -> ContableError {
    let kind = if err.is_timeout() {
        "timed out"
    } else if err.is_connect() {
        "could not connect"
    } else {
        "failed"
    };
    ContableError::transport(format!("request to {url} {kind}: {err}"))
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read error body".to_string());
        return Err(map_http_error(status, body));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|err| ContableError::transport(format!("failed to read response body: {err}")))?;

    serde_json::from_slice(&bytes)
        .map_err(|err| ContableError::response_shape(format!("failed to parse response: {err}")))
}

fn map_http_error(status: StatusCode, body: String) -> ContableError {
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|wrapper| match wrapper.detail {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        })
        .unwrap_or(body);

    ContableError::http_status(status.as_u16(), message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        let client = HttpAssistantClient::new("http://localhost:8000/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000");
        assert_eq!(
            client.url(endpoints::CHAT_MESSAGE),
            "http://localhost:8000/api/chat/message"
        );
    }

    #[test]
    fn empty_base_url_is_rejected() {
        assert!(HttpAssistantClient::new("/").is_err());
    }

    #[test]
    fn http_error_uses_detail_when_present() {
        let err = map_http_error(
            StatusCode::BAD_REQUEST,
            r#"{"detail": "El mensaje no puede estar vacío"}"#.to_string(),
        );
        assert_eq!(
            err,
            ContableError::http_status(400, "El mensaje no puede estar vacío")
        );

        let err = map_http_error(StatusCode::BAD_GATEWAY, "upstream down".to_string());
        assert_eq!(err, ContableError::http_status(502, "upstream down"));
    }
}
