pub mod availability;
pub mod clock;
pub mod models;
pub mod notify;
pub mod otp;
pub mod pricing;
pub mod repository;

/// Failure taxonomy shared by every booking service. The HTTP layer maps each
/// variant onto a status code; the message is what the caller sees.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Invalid OTP")]
    OtpInvalid,
    #[error("OTP has expired")]
    OtpExpired,
    #[error("Dependency failure: {0}")]
    Dependency(String),
}

impl CoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Wraps a store or transport error. The detail is logged by the API
    /// layer and never sent to the client.
    pub fn dependency(err: impl std::fmt::Display) -> Self {
        Self::Dependency(err.to_string())
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
