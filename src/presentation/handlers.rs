use crate::application::auth_service::AuthService;
use crate::application::prediction_service::PredictionService;
use crate::application::upload_service::UploadService;
use crate::domain::error::DomainError;
use crate::domain::models::{BiomarkerPanel, PredictionOutcome};
use crate::domain::repository::{PredictionRepository, UserRepository};
use crate::domain::user::AuthenticatedUser;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError, web};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

/// Shared request-handling state. Services hold their repositories and the
/// read-only model store behind `Arc`s.
pub struct AppState {
    pub auth_service: Arc<AuthService<dyn UserRepository>>,
    pub prediction_service: PredictionService<dyn PredictionRepository>,
    pub upload_service: UploadService<dyn PredictionRepository>,
    pub max_upload_bytes: usize,
}

// Uniform error response format
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Unauthorized(String),
    /// Credential present but rejected; the reason goes to `details`.
    #[error("Token is invalid")]
    InvalidToken(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    PayloadTooLarge(String),
    /// Model or transform failure, reported verbatim.
    #[error("{0}")]
    Processing(String),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) | ApiError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Processing(_) | ApiError::Database(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let error_msg = self.to_string();

        if status.is_server_error() {
            error!(error = %error_msg, status = %status, "Request failed");
        } else {
            warn!(error = %error_msg, status = %status, "Request rejected");
        }

        let details = match self {
            ApiError::InvalidToken(reason) => Some(reason.clone()),
            _ => None,
        };

        HttpResponse::build(status).json(ErrorResponse {
            error: error_msg,
            details,
        })
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<DomainError>() {
            Some(DomainError::Validation(msg)) => ApiError::Validation(msg.clone()),
            Some(DomainError::Unauthorized(msg)) => ApiError::Unauthorized(msg.clone()),
            Some(DomainError::InvalidToken(reason)) => ApiError::InvalidToken(reason.clone()),
            Some(DomainError::Processing(msg)) => ApiError::Processing(msg.clone()),
            Some(DomainError::Internal(msg)) => ApiError::Internal(msg.clone()),
            None => ApiError::Database(err.to_string()),
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    timestamp: String,
}

#[instrument]
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BiomarkerResponse {
    pub success: bool,
    pub prediction_id: String,
    pub result: PredictionOutcome,
}

#[instrument(skip(state, panel), fields(user_id = user.id))]
pub async fn submit_biomarkers(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    panel: web::Json<BiomarkerPanel>,
) -> Result<HttpResponse, ApiError> {
    info!("Biomarker prediction requested");

    let report = state
        .prediction_service
        .predict(user.id, panel.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(BiomarkerResponse {
        success: true,
        prediction_id: report.prediction_id,
        result: report.outcome,
    }))
}

#[instrument(skip(state), fields(user_id = user.id))]
pub async fn list_biomarkers(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    let records = state.prediction_service.history(user.id).await?;
    info!(count = records.len(), "Biomarker history listed");
    Ok(HttpResponse::Ok().json(records))
}
