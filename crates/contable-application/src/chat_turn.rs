//! Chat turn use case.
//!
//! One turn appends the user's message, sends it with a bounded history,
//! animates the simulated progress meanwhile and appends the answer (or the
//! fixed connection-error reply) once the real response is in.

use contable_core::message::CONNECTION_ERROR_MESSAGE;
use contable_core::progress::COMPLETION_DELAY;
use contable_core::service::ChatService;
use contable_core::{ChatMessage, ChatReply, ChatRequest, ContableError, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::time::Instant;

use crate::context_loader::ContextLoader;
use crate::state::{AppState, ReplyMetadata};

/// How a call to [`ChatTurnController::send_turn`] ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Blank input. Nothing was sent and no state changed.
    Skipped,
    /// The server answered; the message is the appended assistant reply.
    Answered(ChatMessage),
    /// The request failed; the message is the appended error reply.
    Failed(ChatMessage),
}

impl TurnOutcome {
    pub fn message(&self) -> Option<&ChatMessage> {
        match self {
            TurnOutcome::Skipped => None,
            TurnOutcome::Answered(message) | TurnOutcome::Failed(message) => Some(message),
        }
    }
}

/// Runs chat turns against the assistant, one at a time.
pub struct ChatTurnController {
    chat: Arc<dyn ChatService>,
    context_loader: Arc<ContextLoader>,
    state: Arc<AppState>,
    in_flight: AtomicBool,
}

impl ChatTurnController {
    pub fn new(
        chat: Arc<dyn ChatService>,
        context_loader: Arc<ContextLoader>,
        state: Arc<AppState>,
    ) -> Self {
        Self {
            chat,
            context_loader,
            state,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Whether a turn is currently in flight.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Sends one turn.
    ///
    /// Transport and response-shape failures are not returned as errors:
    /// they end the turn with [`TurnOutcome::Failed`] after the fixed error
    /// reply has been appended. The only error is
    /// [`ContableError::TurnInFlight`], returned without touching state when
    /// another turn has not finished yet.
    pub async fn send_turn(&self, text: &str) -> Result<TurnOutcome> {
        if text.trim().is_empty() {
            return Ok(TurnOutcome::Skipped);
        }
        let guard = InFlightGuard::acquire(&self.in_flight)?;

        let user_context = self.state.context().await;
        let history = {
            let mut thread = self.state.thread().write().await;
            thread.push(ChatMessage::user(text));
            thread.history_window()
        };
        let request = ChatRequest {
            message: text.to_string(),
            session_id: self.state.session_id().clone(),
            user_context,
            history,
        };
        self.state.set_draft(text).await;

        tracing::info!(
            session_id = %request.session_id,
            history = request.history.len(),
            "sending chat turn"
        );

        let run = self.state.progress().start();
        let started = Instant::now();
        let result = self.chat.send_message(&request).await;
        let elapsed = started.elapsed();

        run.complete();
        tokio::time::sleep(COMPLETION_DELAY).await;

        let outcome = match result {
            Ok(reply) if reply.has_response() => {
                let message = ChatMessage::assistant_from_value(&reply.response);
                self.state.thread().write().await.push(message.clone());
                self.state.set_draft(String::new()).await;
                self.record_reply(&reply, elapsed).await;
                TurnOutcome::Answered(message)
            }
            Ok(_) => {
                tracing::warn!("chat reply carried no response");
                self.append_error_reply().await
            }
            Err(err) => {
                tracing::warn!(error = %err, "chat turn failed");
                self.append_error_reply().await
            }
        };

        drop(run);
        self.state.progress().hide();
        drop(guard);

        if matches!(outcome, TurnOutcome::Answered(_)) {
            self.context_loader.refresh().await;
        }
        Ok(outcome)
    }

    async fn append_error_reply(&self) -> TurnOutcome {
        let message = ChatMessage::assistant(CONNECTION_ERROR_MESSAGE);
        self.state.thread().write().await.push(message.clone());
        self.state.clear_last_reply().await;
        TurnOutcome::Failed(message)
    }

    async fn record_reply(&self, reply: &ChatReply, elapsed: std::time::Duration) {
        tracing::debug!(
            query_type = reply.query_type.as_deref().unwrap_or("-"),
            confidence = reply.confidence.unwrap_or_default(),
            processing_time = reply.processing_time.unwrap_or_default(),
            elapsed_ms = elapsed.as_millis() as u64,
            "chat reply received"
        );
        self.state
            .set_last_reply(ReplyMetadata {
                query_type: reply.query_type.clone(),
                confidence: reply.confidence,
                processing_time: reply.processing_time,
                elapsed,
            })
            .await;
    }
}

/// Clears the in-flight flag when dropped.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ContableError::TurnInFlight)?;
        Ok(Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
