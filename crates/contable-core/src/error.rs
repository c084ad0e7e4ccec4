//! Error types for the Contable client.

use thiserror::Error;

use crate::upload::UploadRejection;

/// A shared error type for the entire Contable client.
///
/// Variants follow the taxonomy the client reports to the user:
/// local validation, transport failures, malformed responses, plus the
/// ambient configuration and IO failures of the binary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ContableError {
    /// A file was rejected before any request was issued
    #[error("Validation error: {0}")]
    Validation(#[from] UploadRejection),

    /// Input rejected locally for a reason other than upload rules
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Network failure or non-OK HTTP status
    #[error("Transport error{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Transport {
        status: Option<u16>,
        message: String,
    },

    /// The server answered, but not with the expected shape
    #[error("Unexpected response: {0}")]
    ResponseShape(String),

    /// A chat turn is already running
    #[error("A chat turn is already in flight")]
    TurnInFlight,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ContableError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a Transport error without an HTTP status
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            status: None,
            message: message.into(),
        }
    }

    /// Creates a Transport error for a non-OK HTTP status
    pub fn http_status(status: u16, message: impl Into<String>) -> Self {
        Self::Transport {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Creates a ResponseShape error
    pub fn response_shape(message: impl Into<String>) -> Self {
        Self::ResponseShape(message.into())
    }

    /// Creates an InvalidInput error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this error was raised locally before any request was sent
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::InvalidInput(_))
    }

    /// Check if this is a transport error
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Check if this is a response-shape error
    pub fn is_response_shape(&self) -> bool {
        matches!(self, Self::ResponseShape(_))
    }

    /// HTTP status carried by a transport error, if any
    pub fn http_status_code(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => *status,
            _ => None,
        }
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for ContableError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for ContableError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for ContableError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, ContableError>`.
pub type Result<T> = std::result::Result<T, ContableError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_display_includes_status_when_present() {
        let err = ContableError::http_status(502, "bad gateway");
        assert_eq!(err.to_string(), "Transport error (HTTP 502): bad gateway");
        assert_eq!(err.http_status_code(), Some(502));

        let err = ContableError::transport("connection refused");
        assert_eq!(err.to_string(), "Transport error: connection refused");
        assert!(err.is_transport());
    }

    #[test]
    fn upload_rejection_converts_to_validation() {
        let err: ContableError = UploadRejection::TooLarge { size: 1 }.into();
        assert!(err.is_validation());
        assert!(!err.is_transport());
    }

    #[test]
    fn json_errors_become_serialization_errors() {
        let parse = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: ContableError = parse.into();
        assert!(matches!(err, ContableError::Serialization { ref format, .. } if format == "JSON"));
    }

    #[test]
    fn toml_errors_become_serialization_errors() {
        let parse = toml::from_str::<toml::Value>("server = [").unwrap_err();
        let err: ContableError = parse.into();
        assert!(matches!(err, ContableError::Serialization { ref format, .. } if format == "TOML"));
    }
}
