use crate::domain::models::{BiomarkerPanel, FEATURE_NAMES};
use crate::infrastructure::model_store::ModelError;
use crate::infrastructure::scaler::StandardScaler;

/// Lays the panel out in fitted column order and applies the scaler.
///
/// Extreme inputs can overflow once scaled; those are rejected by name
/// rather than handed to the classifiers.
pub fn normalize(scaler: &StandardScaler, panel: &BiomarkerPanel) -> Result<Vec<f64>, ModelError> {
    let scaled = scaler.transform(&panel.to_vector())?;
    if let Some(index) = scaled.iter().position(|v| !v.is_finite()) {
        return Err(ModelError::NonFinite {
            model: "scaler",
            input: FEATURE_NAMES[index].to_string(),
        });
    }
    Ok(scaled)
}
