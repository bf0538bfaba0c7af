use crate::domain::error::DomainError;
use crate::domain::models::{MriRecord, NewMriPrediction};
use crate::domain::repository::PredictionRepository;
use crate::infrastructure::image_model::ImagePrediction;
use crate::infrastructure::model_store::{ModelError, ModelStore};
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Upload type that triggers MRI classification.
pub const IMAGE_KIND: &str = "image";

#[derive(Debug)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct UploadReport {
    pub file_id: String,
    pub kind: String,
    pub prediction: Option<ImagePrediction>,
}

/// Reduces a client-supplied filename to a safe basename: path components are
/// dropped, spaces become `_`, anything outside `[A-Za-z0-9._-]` is removed and
/// leading dots are stripped. Returns `None` when nothing usable is left.
pub fn sanitize_filename(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .filter_map(|c| match c {
            ' ' => Some('_'),
            c if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') => Some(c),
            _ => None,
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

pub struct UploadService<R: PredictionRepository + ?Sized> {
    upload_dir: PathBuf,
    models: Arc<ModelStore>,
    repository: Arc<R>,
}

impl<R: PredictionRepository + ?Sized> UploadService<R> {
    pub fn new(upload_dir: PathBuf, models: Arc<ModelStore>, repository: Arc<R>) -> Self {
        Self {
            upload_dir,
            models,
            repository,
        }
    }

    /// Stores the file under its sanitised name, replacing any earlier upload
    /// with the same name. Image uploads are then classified and recorded.
    #[instrument(skip(self, file), fields(filename = %file.filename, size = file.bytes.len()))]
    pub async fn process(
        &self,
        user_id: i64,
        file: UploadedFile,
        kind: &str,
    ) -> Result<UploadReport> {
        let file_id = sanitize_filename(&file.filename)
            .ok_or_else(|| DomainError::Validation("Invalid filename".to_string()))?;

        tokio::fs::create_dir_all(&self.upload_dir).await.map_err(|e| {
            DomainError::Internal(format!("Failed to create upload directory: {}", e))
        })?;
        let path = self.upload_dir.join(&file_id);
        tokio::fs::write(&path, &file.bytes).await.map_err(|e| {
            error!(path = %path.display(), error = %e, "Failed to store upload");
            DomainError::Internal(format!("Failed to store file: {}", e))
        })?;
        info!(path = %path.display(), kind = kind, "Upload stored");

        if kind != IMAGE_KIND {
            return Ok(UploadReport {
                file_id,
                kind: kind.to_string(),
                prediction: None,
            });
        }

        let prediction = self.classify(file.bytes).await.map_err(|e| {
            error!(error = %e, "Image classification failed");
            DomainError::Processing(format!("Error processing image: {}", e))
        })?;

        self.repository
            .save_mri_prediction(NewMriPrediction {
                user_id,
                prediction: prediction.label.clone(),
                probability: prediction.probability,
                file_path: path.display().to_string(),
            })
            .await
            .map_err(|e| DomainError::Processing(format!("Error processing image: {}", e)))?;

        info!(label = %prediction.label, probability = prediction.probability, "Image classified");
        Ok(UploadReport {
            file_id,
            kind: kind.to_string(),
            prediction: Some(prediction),
        })
    }

    pub async fn history(&self, user_id: i64) -> Result<Vec<MriRecord>> {
        self.repository.mri_predictions_for_user(user_id).await
    }

    async fn classify(&self, bytes: Vec<u8>) -> Result<ImagePrediction, ModelError> {
        let classifier = self
            .models
            .image_classifier()
            .ok_or(ModelError::ImageModelMissing)?;
        tokio::task::spawn_blocking(move || classifier.classify(&bytes))
            .await
            .map_err(|e| ModelError::Image(format!("classification task failed: {}", e)))?
    }
}
