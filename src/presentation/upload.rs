use crate::application::upload_service::UploadedFile;
use crate::domain::user::AuthenticatedUser;
use crate::presentation::handlers::{ApiError, AppState};
use actix_multipart::{Field, Multipart};
use actix_web::{HttpResponse, web};
use futures_util::TryStreamExt;
use serde::Serialize;
use tracing::{debug, info, instrument};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub message: &'static str,
    pub file_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
}

/// Running byte budget shared by every part of one multipart body.
struct UploadBudget {
    remaining: usize,
    limit: usize,
}

impl UploadBudget {
    fn new(limit: usize) -> Self {
        Self {
            remaining: limit,
            limit,
        }
    }

    fn take(&mut self, n: usize) -> Result<(), ApiError> {
        self.remaining = self.remaining.checked_sub(n).ok_or_else(|| {
            ApiError::PayloadTooLarge(format!("Upload exceeds {} bytes", self.limit))
        })?;
        Ok(())
    }
}

async fn read_field(field: &mut Field, budget: &mut UploadBudget) -> Result<Vec<u8>, ApiError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field
        .try_next()
        .await
        .map_err(|e| ApiError::Validation(e.to_string()))?
    {
        budget.take(chunk.len())?;
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

#[instrument(skip(state, payload), fields(user_id = user.id))]
pub async fn process_mri(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    mut payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let mut budget = UploadBudget::new(state.max_upload_bytes);
    let mut file: Option<UploadedFile> = None;
    let mut kind: Option<String> = None;

    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| ApiError::Validation(e.to_string()))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") => {
                let filename = field
                    .content_disposition()
                    .and_then(|cd| cd.get_filename())
                    .unwrap_or_default()
                    .to_string();
                let bytes = read_field(&mut field, &mut budget).await?;
                file = Some(UploadedFile { filename, bytes });
            }
            Some("type") => {
                let bytes = read_field(&mut field, &mut budget).await?;
                kind = Some(String::from_utf8_lossy(&bytes).trim().to_string());
            }
            other => {
                debug!(field = ?other, "Ignoring multipart field");
                read_field(&mut field, &mut budget).await?;
            }
        }
    }

    let file = file.ok_or_else(|| ApiError::Validation("No file part".to_string()))?;
    if file.filename.is_empty() {
        return Err(ApiError::Validation("No selected file".to_string()));
    }
    let kind = kind
        .filter(|k| !k.is_empty())
        .ok_or_else(|| ApiError::Validation("Invalid request".to_string()))?;

    info!(filename = %file.filename, kind = %kind, "Upload received");
    let report = state.upload_service.process(user.id, file, &kind).await?;

    let response = match report.prediction {
        Some(prediction) => UploadResponse {
            success: true,
            message: "File uploaded and processed successfully",
            file_id: report.file_id,
            kind: report.kind,
            prediction: Some(prediction.label),
            probability: Some(prediction.probability),
        },
        None => UploadResponse {
            success: true,
            message: "File uploaded successfully",
            file_id: report.file_id,
            kind: report.kind,
            prediction: None,
            probability: None,
        },
    };
    Ok(HttpResponse::Ok().json(response))
}

#[instrument(skip(state), fields(user_id = user.id))]
pub async fn list_mri_predictions(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    let records = state.upload_service.history(user.id).await?;
    info!(count = records.len(), "MRI history listed");
    Ok(HttpResponse::Ok().json(records))
}
