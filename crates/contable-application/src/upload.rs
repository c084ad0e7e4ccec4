//! Document upload use case.

use contable_core::service::{ByteProgress, UploadService};
use contable_core::upload::{UPLOAD_RESPONSE_ERROR, UploadSource, validate_upload};
use contable_core::{ContableError, Result, UploadMode, UploadStatus};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;

use crate::state::AppState;

/// Result of one upload attempt that reached the network.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadReport {
    pub file_name: String,
    pub status: UploadStatus,
    /// Percent left on the indicator: 100 for uploaded and duplicate, 0 on error.
    pub percent: f64,
    /// Localized line for the user.
    pub message: String,
    pub mode: UploadMode,
}

/// Validates files locally and posts them to the upload endpoint.
///
/// Byte progress is published as a 0–100 percentage on a `watch` channel.
/// Uploads are independent of chat turns and never touch the context.
pub struct UploadSubmitter {
    service: Arc<dyn UploadService>,
    state: Arc<AppState>,
    percent: watch::Sender<f64>,
}

impl UploadSubmitter {
    pub fn new(service: Arc<dyn UploadService>, state: Arc<AppState>) -> Self {
        let (percent, _) = watch::channel(0.0);
        Self {
            service,
            state,
            percent,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<f64> {
        self.percent.subscribe()
    }

    pub fn percent(&self) -> f64 {
        *self.percent.borrow()
    }

    /// Uploads a file from disk.
    ///
    /// Extension and size are checked from metadata before the file is read,
    /// so an oversized file is rejected without loading it.
    pub async fn submit_path(&self, path: &Path) -> Result<UploadReport> {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                ContableError::invalid_input(format!("No es un archivo: {}", path.display()))
            })?;

        let metadata = tokio::fs::metadata(path).await?;
        if !metadata.is_file() {
            return Err(ContableError::invalid_input(format!(
                "No es un archivo: {}",
                path.display()
            )));
        }
        validate_upload(&file_name, metadata.len())?;

        let bytes = tokio::fs::read(path).await?;
        self.submit(UploadSource::new(file_name, bytes)).await
    }

    /// Uploads an in-memory file.
    ///
    /// A validation failure is returned as [`ContableError::Validation`] and
    /// no request is issued. Every other failure becomes an
    /// [`UploadStatus::Error`] report.
    pub async fn submit(&self, source: UploadSource) -> Result<UploadReport> {
        validate_upload(&source.file_name, source.size())?;

        let mode = self.state.upload_mode().await;
        let file_name = source.file_name.clone();
        tracing::info!(
            file = %file_name,
            size = source.size(),
            mode = %mode,
            "uploading document"
        );

        self.percent.send_replace(0.0);
        let sender = self.percent.clone();
        let progress: ByteProgress = Arc::new(move |sent, total| {
            sender.send_replace(byte_percent(sent, total));
        });

        let result = self
            .service
            .upload_file(self.state.session_id(), source, progress)
            .await;

        let (status, message) = match result {
            Ok(response) => {
                let status = response.status();
                if status == UploadStatus::Error {
                    tracing::warn!(
                        file = %file_name,
                        server_message = response.message.as_deref().unwrap_or("-"),
                        "upload refused by server"
                    );
                }
                (status, status.message().to_string())
            }
            Err(err) if err.is_response_shape() => {
                tracing::warn!(file = %file_name, error = %err, "unreadable upload response");
                (UploadStatus::Error, UPLOAD_RESPONSE_ERROR.to_string())
            }
            Err(err) => {
                tracing::warn!(file = %file_name, error = %err, "upload failed");
                (UploadStatus::Error, UploadStatus::Error.message().to_string())
            }
        };

        let percent = status.final_percent();
        self.percent.send_replace(percent);
        tracing::debug!(file = %file_name, ?status, "upload finished");

        Ok(UploadReport {
            file_name,
            status,
            percent,
            message,
            mode,
        })
    }
}

fn byte_percent(sent: u64, total: u64) -> f64 {
    if total == 0 {
        return 100.0;
    }
    (sent as f64 * 100.0 / total as f64).min(100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockBackend;
    use contable_core::upload::{UploadRejection, UploadResponse};
    use tempfile::TempDir;

    fn setup() -> (Arc<MockBackend>, Arc<AppState>, UploadSubmitter) {
        let backend = MockBackend::new();
        let state = Arc::new(AppState::new());
        let submitter = UploadSubmitter::new(backend.clone(), state.clone());
        (backend, state, submitter)
    }

    #[tokio::test]
    async fn docx_is_rejected_without_a_request() {
        let (backend, _state, submitter) = setup();

        let err = submitter
            .submit(UploadSource::new("report.docx", b"PK".to_vec()))
            .await
            .unwrap_err();

        assert!(err.is_validation());
        assert!(matches!(
            err,
            ContableError::Validation(UploadRejection::UnsupportedExtension { .. })
        ));
        assert!(backend.uploads().is_empty());
    }

    #[tokio::test]
    async fn ten_megabyte_csv_is_submitted() {
        let (backend, state, submitter) = setup();
        let bytes = vec![b'a'; 10 * 1024 * 1024];

        let report = submitter
            .submit(UploadSource::new("report.csv", bytes))
            .await
            .unwrap();

        assert_eq!(report.status, UploadStatus::Uploaded);
        assert_eq!(report.percent, 100.0);
        let uploads = backend.uploads();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].file_name, "report.csv");
        assert_eq!(uploads[0].size, 10 * 1024 * 1024);
        assert_eq!(uploads[0].session_id, state.session_id().to_string());
    }

    #[tokio::test]
    async fn sixty_megabyte_file_on_disk_is_rejected_for_size() {
        let (backend, _state, submitter) = setup();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.csv");
        let file = std::fs::File::create(&path).unwrap();
        file.set_len(60 * 1024 * 1024).unwrap();

        let err = submitter.submit_path(&path).await.unwrap_err();

        assert!(matches!(
            err,
            ContableError::Validation(UploadRejection::TooLarge { .. })
        ));
        assert!(err.to_string().contains("50 MB"));
        assert!(backend.uploads().is_empty());
    }

    #[tokio::test]
    async fn file_on_disk_is_read_and_sent() {
        let (backend, _state, submitter) = setup();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Balance.PDF");
        std::fs::write(&path, b"%PDF-1.4").unwrap();

        let report = submitter.submit_path(&path).await.unwrap();

        assert_eq!(report.file_name, "Balance.PDF");
        assert_eq!(backend.uploads()[0].size, 8);
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let (backend, _state, submitter) = setup();
        let dir = TempDir::new().unwrap();

        let err = submitter
            .submit_path(&dir.path().join("nada.csv"))
            .await
            .unwrap_err();

        assert!(matches!(err, ContableError::Io { .. }));
        assert!(backend.uploads().is_empty());
    }

    #[tokio::test]
    async fn duplicate_counts_as_complete() {
        let (backend, _state, submitter) = setup();
        backend.push_upload(Ok(UploadResponse {
            success: false,
            is_duplicate: true,
            message: None,
        }));

        let report = submitter
            .submit(UploadSource::new("libro.xlsx", vec![1, 2, 3]))
            .await
            .unwrap();

        assert_eq!(report.status, UploadStatus::Duplicate);
        assert_eq!(report.percent, 100.0);
        assert_eq!(submitter.percent(), 100.0);
    }

    #[tokio::test]
    async fn transport_failure_resets_percent() {
        let (backend, _state, submitter) = setup();
        backend.push_upload(Err(ContableError::http_status(502, "Bad Gateway")));

        let report = submitter
            .submit(UploadSource::new("notas.txt", b"hola".to_vec()))
            .await
            .unwrap();

        assert_eq!(report.status, UploadStatus::Error);
        assert_eq!(report.percent, 0.0);
        assert_eq!(submitter.percent(), 0.0);
        assert_eq!(report.message, UploadStatus::Error.message());
    }

    #[tokio::test]
    async fn unparseable_body_reports_processing_error() {
        let (backend, _state, submitter) = setup();
        backend.push_upload(Err(ContableError::response_shape("expected value")));

        let report = submitter
            .submit(UploadSource::new("notas.txt", b"hola".to_vec()))
            .await
            .unwrap();

        assert_eq!(report.status, UploadStatus::Error);
        assert_eq!(report.message, UPLOAD_RESPONSE_ERROR);
    }

    #[tokio::test]
    async fn unexpected_body_shape_is_an_error() {
        let (backend, _state, submitter) = setup();
        backend.push_upload(Ok(UploadResponse::default()));

        let report = submitter
            .submit(UploadSource::new("notas.txt", b"hola".to_vec()))
            .await
            .unwrap();

        assert_eq!(report.status, UploadStatus::Error);
        assert_eq!(report.percent, 0.0);
    }

    #[tokio::test]
    async fn byte_progress_is_published_as_percent() {
        let (_backend, _state, submitter) = setup();
        let mut rx = submitter.subscribe();

        let watcher = tokio::spawn(async move {
            let mut seen = Vec::new();
            while rx.changed().await.is_ok() {
                let value = *rx.borrow_and_update();
                seen.push(value);
                if value >= 100.0 {
                    break;
                }
            }
            seen
        });

        submitter
            .submit(UploadSource::new("notas.txt", vec![0; 1_000]))
            .await
            .unwrap();

        let seen = watcher.await.unwrap();
        assert_eq!(seen.last().copied(), Some(100.0));
        assert!(seen.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[tokio::test]
    async fn mode_is_reported_but_not_sent() {
        let (backend, state, submitter) = setup();
        state.set_upload_mode(UploadMode::Context).await;

        let report = submitter
            .submit(UploadSource::new("notas.txt", b"hola".to_vec()))
            .await
            .unwrap();

        assert_eq!(report.mode, UploadMode::Context);
        assert_eq!(backend.uploads().len(), 1);
    }

    #[test]
    fn byte_percent_handles_empty_bodies() {
        assert_eq!(byte_percent(0, 0), 100.0);
        assert_eq!(byte_percent(50, 200), 25.0);
        assert_eq!(byte_percent(300, 200), 100.0);
    }
}
