//! Rating the assistant's last answer.

use contable_core::feedback::{
    FeedbackReceipt, FeedbackSubmission, MAX_COMMENT_CHARS, MAX_QUERY_CHARS, MAX_RESPONSE_CHARS,
    Rating, truncate_chars,
};
use contable_core::message::CONNECTION_ERROR_MESSAGE;
use contable_core::service::FeedbackService;
use contable_core::{ContableError, Result};
use std::sync::Arc;

use crate::state::AppState;

pub struct FeedbackReporter {
    service: Arc<dyn FeedbackService>,
    state: Arc<AppState>,
}

impl FeedbackReporter {
    pub fn new(service: Arc<dyn FeedbackService>, state: Arc<AppState>) -> Self {
        Self { service, state }
    }

    /// Submits a 1–5 rating for the most recent question and answer.
    ///
    /// Texts are truncated to the server's limits. Fails locally, without a
    /// request, when the rating is out of range or the last turn produced no
    /// answer.
    pub async fn rate_last_turn(
        &self,
        rating: u8,
        comment: Option<String>,
    ) -> Result<FeedbackReceipt> {
        let rating = Rating::new(rating)?;

        let (query, response) = {
            let thread = self.state.thread().read().await;
            let (query, response) = thread.last_exchange().ok_or_else(|| {
                ContableError::invalid_input("Todavía no hay ninguna respuesta para calificar.")
            })?;
            if response.content == CONNECTION_ERROR_MESSAGE {
                return Err(ContableError::invalid_input(
                    "La última consulta no obtuvo respuesta; no hay nada que calificar.",
                ));
            }
            (query.content.clone(), response.content.clone())
        };
        let metadata = self.state.last_reply().await;
        let session_id = self.state.session_id().to_string();

        let submission = FeedbackSubmission {
            session_id: session_id.clone(),
            query: truncate_chars(&query, MAX_QUERY_CHARS),
            response: truncate_chars(&response, MAX_RESPONSE_CHARS),
            rating,
            feedback_text: comment
                .map(|text| text.trim().to_string())
                .filter(|text| !text.is_empty())
                .map(|text| truncate_chars(&text, MAX_COMMENT_CHARS)),
            categories: None,
            user_id: Some(session_id),
            response_time: metadata
                .as_ref()
                .map(|m| m.processing_time.unwrap_or(m.elapsed.as_secs_f64())),
            query_type: metadata.and_then(|m| m.query_type),
        };

        let receipt = self.service.submit_feedback(&submission).await?;
        tracing::info!(
            rating = rating.value(),
            feedback_id = receipt.feedback_id.as_deref().unwrap_or("-"),
            "feedback submitted"
        );
        Ok(receipt)
    }
}
