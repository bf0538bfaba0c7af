use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Token is invalid: {0}")]
    InvalidToken(String),
    /// Model or transform failure; the message is reported to the client as-is.
    #[error("{0}")]
    Processing(String),
    #[error("Internal error: {0}")]
    Internal(String),
}
