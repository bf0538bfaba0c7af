use crate::domain::models::{BloodTestRecord, MriRecord, NewBloodTest, NewMriPrediction};
use crate::domain::repository::PredictionRepository;
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct PredictionTables {
    blood_tests: Vec<BloodTestRecord>,
    mri_predictions: Vec<MriRecord>,
}

#[derive(Clone, Default)]
pub struct InMemoryPredictionRepository {
    storage: Arc<RwLock<PredictionTables>>,
}

impl InMemoryPredictionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn blood_test_count(&self) -> usize {
        self.storage.read().await.blood_tests.len()
    }

    pub async fn mri_prediction_count(&self) -> usize {
        self.storage.read().await.mri_predictions.len()
    }
}

#[async_trait]
impl PredictionRepository for InMemoryPredictionRepository {
    async fn save_blood_test(&self, record: NewBloodTest) -> Result<BloodTestRecord> {
        let mut storage = self.storage.write().await;
        let saved = BloodTestRecord {
            id: storage.blood_tests.len() as i64 + 1,
            user_id: record.user_id,
            histological_type: record.histological_type,
            panel: record.panel,
            prediction: record.prediction,
            created_at: Utc::now(),
        };
        storage.blood_tests.push(saved.clone());
        Ok(saved)
    }

    async fn blood_tests_for_user(&self, user_id: i64) -> Result<Vec<BloodTestRecord>> {
        let storage = self.storage.read().await;
        Ok(storage
            .blood_tests
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn save_mri_prediction(&self, record: NewMriPrediction) -> Result<MriRecord> {
        let mut storage = self.storage.write().await;
        let saved = MriRecord {
            id: storage.mri_predictions.len() as i64 + 1,
            user_id: record.user_id,
            prediction: record.prediction,
            probability: record.probability,
            file_path: record.file_path,
            created_at: Utc::now(),
        };
        storage.mri_predictions.push(saved.clone());
        Ok(saved)
    }

    async fn mri_predictions_for_user(&self, user_id: i64) -> Result<Vec<MriRecord>> {
        let storage = self.storage.read().await;
        Ok(storage
            .mri_predictions
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }
}
