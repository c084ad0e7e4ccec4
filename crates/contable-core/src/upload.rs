//! Upload rules and outcomes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Extensions accepted for reference documents (lowercase, no dot).
pub const ALLOWED_EXTENSIONS: [&str; 5] = ["pdf", "txt", "xlsx", "xls", "csv"];

/// Largest file the client will submit: 50 MiB.
pub const MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// How the user intends the document to be used.
///
/// UI-only: both modes hit the same endpoint and the flag is not sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadMode {
    #[default]
    Train,
    Context,
}

impl UploadMode {
    pub fn label(self) -> &'static str {
        match self {
            UploadMode::Train => "Modo Entrenamiento",
            UploadMode::Context => "Modo Contexto",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "train" | "entrenar" | "entrenamiento" => Some(UploadMode::Train),
            "context" | "contexto" => Some(UploadMode::Context),
            _ => None,
        }
    }
}

impl fmt::Display for UploadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadMode::Train => f.write_str("train"),
            UploadMode::Context => f.write_str("context"),
        }
    }
}

/// Reasons a file is refused before any request is issued.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadRejection {
    #[error("Formato no soportado ({extension}). Usa PDF, TXT, XLSX, XLS o CSV.")]
    UnsupportedExtension { extension: String },

    #[error("El archivo supera el límite de 50 MB ({} MB).", .size / (1024 * 1024))]
    TooLarge { size: u64 },
}

/// Checks a candidate file against the extension and size rules.
pub fn validate_upload(file_name: &str, size: u64) -> Result<(), UploadRejection> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        let shown = if extension.is_empty() {
            "sin extensión".to_string()
        } else {
            format!(".{extension}")
        };
        return Err(UploadRejection::UnsupportedExtension { extension: shown });
    }

    if size > MAX_UPLOAD_BYTES {
        return Err(UploadRejection::TooLarge { size });
    }

    Ok(())
}

/// Terminal status of one upload attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Uploaded,
    Duplicate,
    Error,
}

impl UploadStatus {
    /// Localized status line shown under the upload.
    pub fn message(self) -> &'static str {
        match self {
            UploadStatus::Uploaded => "✅ Archivo subido y procesado correctamente.",
            UploadStatus::Duplicate => "Este archivo ya fue subido.",
            UploadStatus::Error => "❌ Error al subir el archivo.",
        }
    }

    /// Percent shown once the status is known.
    pub fn final_percent(self) -> f64 {
        match self {
            UploadStatus::Uploaded | UploadStatus::Duplicate => 100.0,
            UploadStatus::Error => 0.0,
        }
    }
}

/// Message shown when the server answers with something unparseable.
pub const UPLOAD_RESPONSE_ERROR: &str = "❌ Error procesando respuesta del servidor.";

/// Body returned by the upload endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub is_duplicate: bool,
    #[serde(default)]
    pub message: Option<String>,
}

impl UploadResponse {
    /// Maps the body onto a terminal status. Success wins over duplicate.
    pub fn status(&self) -> UploadStatus {
        if self.success {
            UploadStatus::Uploaded
        } else if self.is_duplicate {
            UploadStatus::Duplicate
        } else {
            UploadStatus::Error
        }
    }
}

/// A file ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSource {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadSource {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// One entry of the server's uploaded-files listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedFileInfo {
    pub id: String,
    pub name: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub file_type: String,
    pub upload_time: String,
    pub status: String,
    #[serde(default)]
    pub chunks_created: u64,
}
