//! Application layer for the accounting assistant client.
//!
//! Use cases coordinate the domain types in `contable-core`, the remote
//! services behind its traits and the progress runner from
//! `contable-execution`.

pub mod bootstrap;
pub mod chat_turn;
pub mod context_loader;
pub mod feedback;
pub mod state;
pub mod upload;

#[cfg(test)]
mod test_support;

pub use bootstrap::{ContableApp, StartupReport};
pub use chat_turn::{ChatTurnController, TurnOutcome};
pub use context_loader::ContextLoader;
pub use feedback::FeedbackReporter;
pub use state::{AppState, ReplyMetadata};
pub use upload::{UploadReport, UploadSubmitter};
