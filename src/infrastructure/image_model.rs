use crate::domain::models::MRI_CLASSES;
use crate::infrastructure::classifier::LinearClassifier;
use crate::infrastructure::model_store::ModelError;
use image::imageops::FilterType;

/// Side length images are resized to before classification.
pub const IMAGE_SIDE: u32 = 150;
pub const IMAGE_FEATURES: usize = (IMAGE_SIDE * IMAGE_SIDE * 3) as usize;

#[derive(Debug, Clone, PartialEq)]
pub struct ImagePrediction {
    pub label: String,
    pub probability: f64,
}

/// Classifies an encoded MRI image into one of [`MRI_CLASSES`].
pub trait ImageClassifier: Send + Sync {
    fn classify(&self, image_bytes: &[u8]) -> Result<ImagePrediction, ModelError>;
}

/// Decodes, resizes to 150x150 RGB (nearest neighbour), scales to `[0, 1]` and flattens.
pub fn preprocess_image(image_bytes: &[u8]) -> Result<Vec<f64>, ModelError> {
    let img = image::load_from_memory(image_bytes).map_err(|e| ModelError::Image(e.to_string()))?;
    let rgb = img
        .resize_exact(IMAGE_SIDE, IMAGE_SIDE, FilterType::Nearest)
        .to_rgb8();
    Ok(rgb
        .into_raw()
        .into_iter()
        .map(|channel| f64::from(channel) / 255.0)
        .collect())
}

/// Linear model over flattened pixels.
pub struct LinearImageClassifier {
    model: LinearClassifier,
}

impl LinearImageClassifier {
    pub fn new(model: LinearClassifier) -> Result<Self, ModelError> {
        model.validate("mri")?;
        if model.classes != MRI_CLASSES {
            return Err(ModelError::InvalidArtifact {
                model: "mri",
                reason: format!("classes must be {:?}, found {:?}", MRI_CLASSES, model.classes),
            });
        }
        if model.n_features() != IMAGE_FEATURES {
            return Err(ModelError::InvalidArtifact {
                model: "mri",
                reason: format!(
                    "expected {} pixel features, found {}",
                    IMAGE_FEATURES,
                    model.n_features()
                ),
            });
        }
        Ok(Self { model })
    }
}

impl ImageClassifier for LinearImageClassifier {
    fn classify(&self, image_bytes: &[u8]) -> Result<ImagePrediction, ModelError> {
        let pixels = preprocess_image(image_bytes)?;
        let prediction = self.model.predict(&pixels)?;
        Ok(ImagePrediction {
            probability: prediction.probability(),
            label: prediction.label,
        })
    }
}
