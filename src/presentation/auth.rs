use crate::domain::user::{AuthenticatedUser, CreateUser, LoginRequest};
use crate::presentation::handlers::{ApiError, AppState};
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: AuthenticatedUser,
}

#[instrument(skip(state, req), fields(email = %req.email))]
pub async fn register(
    state: web::Data<AppState>,
    req: web::Json<CreateUser>,
) -> Result<HttpResponse, ApiError> {
    info!("Registration request received");

    let user = state.auth_service.register_user(req.into_inner()).await?;

    Ok(HttpResponse::Created().json(AuthenticatedUser::from(&user)))
}

#[instrument(skip(state, req), fields(email = %req.email))]
pub async fn login(
    state: web::Data<AppState>,
    req: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    info!("Login request received");

    let session = state.auth_service.login(req.into_inner()).await?;

    Ok(HttpResponse::Ok().json(LoginResponse {
        token: session.token,
        user: session.user,
    }))
}
