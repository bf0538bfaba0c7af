//! Pre-fitted model artifacts, loaded once at startup and shared read-only.
//!
//! Artifacts are JSON files in the model directory:
//!
//! | file              | contents                                   |
//! |-------------------|--------------------------------------------|
//! | `scaler.json`     | [`StandardScaler`]                         |
//! | `clf_status.json` | binary [`LinearClassifier`]                |
//! | `clf_hist.json`   | histological-type [`LinearClassifier`]     |
//! | `clf_stage.json`  | stage [`LinearClassifier`]                 |
//! | `mri_model.json`  | optional image [`LinearClassifier`]        |

use crate::infrastructure::classifier::LinearClassifier;
use crate::infrastructure::image_model::{ImageClassifier, LinearImageClassifier};
use crate::infrastructure::scaler::StandardScaler;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument, warn};

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("failed to read model artifact {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse model artifact {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{model} expects {expected} features as input, got {actual}")]
    WidthMismatch {
        model: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("{model} produced a non-finite value for {input}")]
    NonFinite { model: &'static str, input: String },
    #[error("invalid {model} artifact: {reason}")]
    InvalidArtifact { model: &'static str, reason: String },
    #[error("failed to decode image: {0}")]
    Image(String),
    #[error("image model is not loaded")]
    ImageModelMissing,
}

pub struct ModelStore {
    scaler: StandardScaler,
    status: LinearClassifier,
    histology: LinearClassifier,
    stage: LinearClassifier,
    image: Option<Arc<dyn ImageClassifier>>,
}

impl ModelStore {
    pub fn new(
        scaler: StandardScaler,
        status: LinearClassifier,
        histology: LinearClassifier,
        stage: LinearClassifier,
    ) -> Result<Self, ModelError> {
        scaler.validate()?;
        status.validate("status")?;
        histology.validate("histology")?;
        stage.validate("stage")?;
        if status.n_classes() != 2 {
            return Err(ModelError::InvalidArtifact {
                model: "status",
                reason: format!(
                    "expected a binary classifier, found {} classes",
                    status.n_classes()
                ),
            });
        }

        Ok(Self {
            scaler,
            status,
            histology,
            stage,
            image: None,
        })
    }

    pub fn with_image_classifier(mut self, classifier: Arc<dyn ImageClassifier>) -> Self {
        self.image = Some(classifier);
        self
    }

    #[instrument(skip_all, fields(dir = %dir.as_ref().display()))]
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, ModelError> {
        let dir = dir.as_ref();

        let store = Self::new(
            read_artifact(&dir.join("scaler.json"))?,
            read_artifact(&dir.join("clf_status.json"))?,
            read_artifact(&dir.join("clf_hist.json"))?,
            read_artifact(&dir.join("clf_stage.json"))?,
        )?;

        let image_path = dir.join("mri_model.json");
        let store = if image_path.exists() {
            let classifier = LinearImageClassifier::new(read_artifact(&image_path)?)?;
            info!(path = %image_path.display(), "Image model loaded");
            store.with_image_classifier(Arc::new(classifier))
        } else {
            warn!(
                path = %image_path.display(),
                "No image model found, image uploads will not be classified"
            );
            store
        };

        info!(
            features = store.scaler.n_features(),
            histology_classes = store.histology.n_classes(),
            stage_classes = store.stage.n_classes(),
            "Model artifacts loaded"
        );
        Ok(store)
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    pub fn status(&self) -> &LinearClassifier {
        &self.status
    }

    pub fn histology(&self) -> &LinearClassifier {
        &self.histology
    }

    pub fn stage(&self) -> &LinearClassifier {
        &self.stage
    }

    pub fn image_classifier(&self) -> Option<Arc<dyn ImageClassifier>> {
        self.image.clone()
    }
}

fn read_artifact<T: DeserializeOwned>(path: &Path) -> Result<T, ModelError> {
    let raw = fs::read_to_string(path).map_err(|source| ModelError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ModelError::Parse {
        path: path.display().to_string(),
        source,
    })
}
