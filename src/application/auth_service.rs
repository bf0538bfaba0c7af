use crate::domain::error::DomainError;
use crate::domain::repository::UserRepository;
use crate::domain::user::{AuthenticatedUser, CreateUser, LoginRequest, NewUser, User};
use crate::infrastructure::security::{
    generate_token, hash_password, validate_token, verify_password,
};
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, trace, warn};

/// A freshly issued bearer token and the identity it was issued for.
#[derive(Debug, Clone)]
pub struct LoginSession {
    pub token: String,
    pub user: AuthenticatedUser,
}

pub struct AuthService<R: UserRepository + ?Sized> {
    user_repository: Arc<R>,
    jwt_secret: String,
}

impl<R: UserRepository + ?Sized> AuthService<R> {
    pub fn new(user_repository: Arc<R>, jwt_secret: String) -> Self {
        Self {
            user_repository,
            jwt_secret,
        }
    }

    #[instrument(skip(self, req), fields(email = %req.email))]
    pub async fn register_user(&self, req: CreateUser) -> Result<User> {
        trace!("Starting user registration");

        if req.email.trim().is_empty() || req.password.is_empty() {
            return Err(
                DomainError::Validation("Email and password are required".to_string()).into(),
            );
        }
        if self.user_repository.find_user_by_email(&req.email).await?.is_some() {
            warn!(email = %req.email, "User already exists");
            return Err(DomainError::Validation(
                "User with this email already exists".to_string(),
            )
            .into());
        }

        let password_hash = hash_password(&req.password).map_err(|e| {
            error!(error = %e, "Failed to hash password");
            DomainError::Internal(format!("Failed to hash password: {}", e))
        })?;

        let user = self
            .user_repository
            .save_user(NewUser {
                first_name: req.first_name,
                last_name: req.last_name,
                email: req.email,
                password_hash,
            })
            .await?;

        info!(user_id = user.id, email = %user.email, "User registered successfully");
        Ok(user)
    }

    #[instrument(skip(self, req), fields(email = %req.email))]
    pub async fn login(&self, req: LoginRequest) -> Result<LoginSession> {
        trace!("Starting login");

        let invalid = || DomainError::Unauthorized("Invalid credentials".to_string());

        let user = self
            .user_repository
            .find_user_by_email(&req.email)
            .await?
            .ok_or_else(|| {
                warn!(email = %req.email, "User not found during login");
                invalid()
            })?;

        let is_valid = verify_password(&req.password, &user.password_hash).map_err(|e| {
            error!(user_id = user.id, error = %e, "Stored password hash is unreadable");
            DomainError::Internal(format!("Failed to verify password: {}", e))
        })?;
        if !is_valid {
            warn!(user_id = user.id, "Invalid password during login");
            return Err(invalid().into());
        }

        let token = generate_token(&user, &self.jwt_secret).map_err(|e| {
            error!(error = %e, "Failed to generate token");
            DomainError::Internal(format!("Failed to generate token: {}", e))
        })?;

        info!(user_id = user.id, "Login successful");
        Ok(LoginSession {
            token,
            user: AuthenticatedUser::from(&user),
        })
    }

    /// Resolves a bearer token to the user it was issued for. The token must
    /// verify and its subject must still exist.
    #[instrument(skip_all)]
    pub async fn authenticate(&self, token: &str) -> Result<AuthenticatedUser> {
        let claims = validate_token(token, &self.jwt_secret).map_err(|e| {
            debug!(error = %e, "Token rejected");
            DomainError::InvalidToken(e.to_string())
        })?;

        let user_id: i64 = claims
            .sub
            .parse()
            .map_err(|_| DomainError::InvalidToken(format!("malformed subject {:?}", claims.sub)))?;

        let user = self
            .user_repository
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| {
                warn!(user_id = user_id, "Token subject does not exist");
                DomainError::InvalidToken("User not found".to_string())
            })?;

        trace!(user_id = user.id, "Token accepted");
        Ok(AuthenticatedUser::from(&user))
    }
}
