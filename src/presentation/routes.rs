use crate::presentation::auth::{login, register};
use crate::presentation::handlers::{ApiError, health_check, list_biomarkers, submit_biomarkers};
use crate::presentation::middleware::JwtAuthMiddleware;
use crate::presentation::upload::{list_mri_predictions, process_mri};
use actix_web::{Scope, web};

/// The `/api` scope. Prediction and upload resources sit behind the bearer gate;
/// health and auth are public.
pub fn api_scope(auth: JwtAuthMiddleware) -> Scope {
    web::scope("/api")
        .app_data(web::JsonConfig::default().error_handler(|err, _req| {
            ApiError::Validation(err.to_string()).into()
        }))
        .route("/health", web::get().to(health_check))
        .route("/auth/login", web::post().to(login))
        .route("/auth/register", web::post().to(register))
        .service(
            web::resource("/biomarkers")
                .route(web::post().to(submit_biomarkers))
                .route(web::get().to(list_biomarkers))
                .wrap(auth.clone()),
        )
        .service(
            web::resource("/process_mri")
                .route(web::post().to(process_mri))
                .route(web::get().to(list_mri_predictions))
                .wrap(auth),
        )
}
