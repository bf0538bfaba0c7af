use crate::domain::models::{BloodTestRecord, MriRecord, NewBloodTest, NewMriPrediction};
use crate::domain::user::{NewUser, User};
use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `DomainError::Validation` when the email is already taken.
    async fn save_user(&self, user: NewUser) -> Result<User>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>>;
}

#[async_trait]
pub trait PredictionRepository: Send + Sync {
    async fn save_blood_test(&self, record: NewBloodTest) -> Result<BloodTestRecord>;
    async fn blood_tests_for_user(&self, user_id: i64) -> Result<Vec<BloodTestRecord>>;
    async fn save_mri_prediction(&self, record: NewMriPrediction) -> Result<MriRecord>;
    async fn mri_predictions_for_user(&self, user_id: i64) -> Result<Vec<MriRecord>>;
}
