use crate::application::normalizer::normalize;
use crate::domain::error::DomainError;
use crate::domain::models::{
    BiomarkerPanel, BloodTestRecord, NewBloodTest, PredictionOutcome, RiskLevel,
};
use crate::domain::repository::PredictionRepository;
use crate::infrastructure::model_store::{ModelError, ModelStore};
use anyhow::Result;
use chrono::Local;
use std::sync::Arc;
use tracing::{error, info, instrument};

#[derive(Debug, Clone)]
pub struct PredictionReport {
    pub prediction_id: String,
    pub record_id: i64,
    pub outcome: PredictionOutcome,
}

pub struct PredictionService<R: PredictionRepository + ?Sized> {
    models: Arc<ModelStore>,
    repository: Arc<R>,
}

impl<R: PredictionRepository + ?Sized> PredictionService<R> {
    pub fn new(models: Arc<ModelStore>, repository: Arc<R>) -> Self {
        Self { models, repository }
    }

    /// Runs every model on the panel. Pure: nothing is persisted.
    pub fn classify(&self, panel: &BiomarkerPanel) -> Result<PredictionOutcome, ModelError> {
        let scaled = normalize(self.models.scaler(), panel)?;

        let status = self.models.status().predict(&scaled)?;
        let probability = status.probabilities[1];
        let stage = self.models.stage().predict(&scaled)?;
        let histology = self.models.histology().predict(&scaled)?;

        Ok(PredictionOutcome {
            prediction: status.index as u8,
            probability,
            stage: stage.index as u32,
            histological_type: histology.label,
            risk_level: RiskLevel::from_probability(probability),
        })
    }

    /// Classifies the panel and records it against `user_id`. Nothing is
    /// written unless every model step succeeded.
    #[instrument(skip(self, panel))]
    pub async fn predict(&self, user_id: i64, panel: BiomarkerPanel) -> Result<PredictionReport> {
        let outcome = self.classify(&panel).map_err(|e| {
            error!(error = %e, "Biomarker classification failed");
            DomainError::Processing(e.to_string())
        })?;

        let record = self
            .repository
            .save_blood_test(NewBloodTest {
                user_id,
                panel,
                histological_type: outcome.histological_type.clone(),
                prediction: outcome.prediction,
            })
            .await?;

        info!(
            record_id = record.id,
            prediction = outcome.prediction,
            probability = outcome.probability,
            risk_level = outcome.risk_level.as_str(),
            "Biomarker prediction stored"
        );

        Ok(PredictionReport {
            prediction_id: format!("pred_{}", Local::now().format("%Y%m%d%H%M%S")),
            record_id: record.id,
            outcome,
        })
    }

    pub async fn history(&self, user_id: i64) -> Result<Vec<BloodTestRecord>> {
        self.repository.blood_tests_for_user(user_id).await
    }
}
