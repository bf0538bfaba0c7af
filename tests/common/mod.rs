#![allow(dead_code)]

use actix_web::web;
use biomarker_screen_api::application::auth_service::AuthService;
use biomarker_screen_api::application::prediction_service::PredictionService;
use biomarker_screen_api::application::upload_service::UploadService;
use biomarker_screen_api::domain::models::FEATURE_COUNT;
use biomarker_screen_api::domain::repository::{PredictionRepository, UserRepository};
use biomarker_screen_api::domain::user::{CreateUser, User};
use biomarker_screen_api::infrastructure::classifier::LinearClassifier;
use biomarker_screen_api::infrastructure::image_model::{ImageClassifier, ImagePrediction};
use biomarker_screen_api::infrastructure::model_store::{ModelError, ModelStore};
use biomarker_screen_api::infrastructure::scaler::StandardScaler;
use biomarker_screen_api::presentation::handlers::AppState;
use biomarker_screen_api::presentation::middleware::JwtAuthMiddleware;
use std::path::Path;
use std::sync::Arc;

pub const JWT_SECRET: &str = "test-secret-key-for-testing-only";
pub const PASSWORD: &str = "password123";

/// Always answers "Malignant cases" unless the image is empty.
pub struct StubImageClassifier;

impl ImageClassifier for StubImageClassifier {
    fn classify(&self, image_bytes: &[u8]) -> Result<ImagePrediction, ModelError> {
        if image_bytes.is_empty() {
            return Err(ModelError::Image("empty image".to_string()));
        }
        Ok(ImagePrediction {
            label: "Malignant cases".to_string(),
            probability: 0.9,
        })
    }
}

fn one_hot(index: usize) -> Vec<f64> {
    let mut row = vec![0.0; FEATURE_COUNT];
    row[index] = 1.0;
    row
}

/// Identity scaler and linear models driven by single biomarkers:
/// status score = proline, histology by the sign of taurine, stage by carnitine.
pub fn test_models(scaler_width: usize) -> ModelStore {
    test_models_with_scaler(
        StandardScaler::new(vec![0.0; scaler_width], vec![1.0; scaler_width]).unwrap(),
    )
}

pub fn test_models_with_scaler(scaler: StandardScaler) -> ModelStore {
    let taurine = one_hot(5);
    let negated: Vec<f64> = taurine.iter().map(|w| -w).collect();
    let carnitine = one_hot(9);
    let negated_carnitine: Vec<f64> = carnitine.iter().map(|w| -w).collect();

    ModelStore::new(
        scaler,
        LinearClassifier {
            classes: vec!["0".to_string(), "1".to_string()],
            coef: vec![one_hot(0)],
            intercept: vec![0.0],
        },
        LinearClassifier {
            classes: vec![
                "Adenocarcinoma".to_string(),
                "Squamous Cell Carcinoma".to_string(),
            ],
            coef: vec![negated, taurine],
            intercept: vec![0.0, 0.0],
        },
        LinearClassifier {
            classes: vec!["I".to_string(), "II".to_string(), "III".to_string()],
            coef: vec![negated_carnitine, vec![0.0; FEATURE_COUNT], carnitine],
            intercept: vec![0.0, 0.5, 0.0],
        },
    )
    .unwrap()
    .with_image_classifier(Arc::new(StubImageClassifier))
}

pub struct TestContext {
    pub state: web::Data<AppState>,
    pub auth: JwtAuthMiddleware,
    pub auth_service: Arc<AuthService<dyn UserRepository>>,
}

pub fn build_context(
    users: Arc<dyn UserRepository>,
    predictions: Arc<dyn PredictionRepository>,
    models: ModelStore,
    upload_dir: &Path,
    max_upload_bytes: usize,
) -> TestContext {
    let models = Arc::new(models);
    let auth_service = Arc::new(AuthService::new(users, JWT_SECRET.to_string()));
    let state = web::Data::new(AppState {
        auth_service: auth_service.clone(),
        prediction_service: PredictionService::new(models.clone(), predictions.clone()),
        upload_service: UploadService::new(upload_dir.to_path_buf(), models, predictions),
        max_upload_bytes,
    });
    TestContext {
        state,
        auth: JwtAuthMiddleware::new(auth_service.clone()),
        auth_service,
    }
}

pub async fn register(auth_service: &AuthService<dyn UserRepository>, email: &str) -> User {
    auth_service
        .register_user(CreateUser {
            email: email.to_string(),
            password: PASSWORD.to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
        })
        .await
        .unwrap()
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}
