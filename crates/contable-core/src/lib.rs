pub mod chat;
pub mod config;
pub mod context;
pub mod error;
pub mod feedback;
pub mod message;
pub mod progress;
pub mod service;
pub mod session;
pub mod upload;

// Re-export common error type
pub use error::{ContableError, Result};

pub use chat::{ChatReply, ChatRequest};
pub use context::UserContext;
pub use message::{ChatMessage, MessageRole, MessageThread};
pub use progress::{ProgressSimulator, ProgressState, Stage};
pub use session::SessionId;
pub use upload::{UploadMode, UploadStatus};
