use crate::infrastructure::model_store::ModelError;
use serde::{Deserialize, Serialize};

/// Fitted standardisation: `(x - mean) / scale` per column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Result<Self, ModelError> {
        let scaler = Self { mean, scale };
        scaler.validate()?;
        Ok(scaler)
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.mean.is_empty() {
            return Err(ModelError::InvalidArtifact {
                model: "scaler",
                reason: "no columns".to_string(),
            });
        }
        if self.mean.len() != self.scale.len() {
            return Err(ModelError::InvalidArtifact {
                model: "scaler",
                reason: format!(
                    "mean has {} columns but scale has {}",
                    self.mean.len(),
                    self.scale.len()
                ),
            });
        }
        if self.mean.iter().chain(&self.scale).any(|v| !v.is_finite()) {
            return Err(ModelError::InvalidArtifact {
                model: "scaler",
                reason: "non-finite parameter".to_string(),
            });
        }
        Ok(())
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn transform(&self, input: &[f64]) -> Result<Vec<f64>, ModelError> {
        if input.len() != self.n_features() {
            return Err(ModelError::WidthMismatch {
                model: "scaler",
                expected: self.n_features(),
                actual: input.len(),
            });
        }

        Ok(input
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (mean, scale))| {
                // constant columns were fitted with a zero scale
                let scale = if *scale == 0.0 { 1.0 } else { *scale };
                (x - mean) / scale
            })
            .collect())
    }
}
