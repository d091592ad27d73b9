//! Auth Error Types
//!
//! This module provides auth-specific error variants that integrate
//! with the unified `kernel::error::AppError` system. Every variant maps to
//! one stable machine code and one [`ErrorCategory`].

use kernel::error::{app_error::AppError, category::ErrorCategory, kind::ErrorKind};
use thiserror::Error;

/// Auth-specific result type alias
pub type AuthResult<T> = Result<T, AuthError>;

/// Auth-specific error variants
#[derive(Debug, Error)]
pub enum AuthError {
    // ------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------
    /// Malformed input rejected by a value object
    #[error("{}", .0.message())]
    Validation(#[source] AppError),

    // ------------------------------------------------------------------
    // Auth
    // ------------------------------------------------------------------
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Well-formed token past its expiry; the caller may attempt a refresh
    #[error("Token has expired")]
    TokenExpired,

    /// Malformed, mis-signed or foreign token; hard reject
    #[error("Token is invalid")]
    TokenInvalid,

    /// Refresh token where an access token is required, or vice versa
    #[error("Invalid token type")]
    InvalidTokenType,

    #[error("Session not found")]
    SessionNotFound,

    /// Session exists but can no longer back the presented credential
    #[error("Session is no longer valid")]
    InvalidSession,

    #[error("Session does not belong to this user")]
    SessionUserMismatch,

    // ------------------------------------------------------------------
    // Business
    // ------------------------------------------------------------------
    #[error("User not found")]
    UserNotFound,

    #[error("Account is temporarily locked")]
    AccountLocked,

    #[error("Refresh token has expired")]
    RefreshTokenExpired,

    // ------------------------------------------------------------------
    // System
    // ------------------------------------------------------------------
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization failure or deadlock reported by a non-Postgres backend
    #[error("Transaction conflict: {0}")]
    TransactionConflict(String),

    #[error("Token signing failed: {0}")]
    TokenSigning(#[source] jsonwebtoken::errors::Error),

    #[error("Invalid signing key configuration: {0}")]
    KeyConfiguration(String),

    #[error("Password hashing failed: {0}")]
    PasswordHashing(String),

    /// A unit of work failed and was rolled back
    #[error("{code}: {source}")]
    TransactionFailed {
        code: &'static str,
        #[source]
        source: Box<AuthError>,
    },

    /// A batch group failed; earlier groups stay committed
    #[error("Batch execution failed at index {offset}: {source}")]
    BatchFailed {
        offset: usize,
        #[source]
        source: Box<AuthError>,
    },

    /// A saga step failed and every compensation ran cleanly
    #[error("Saga step {step} ({name}) failed: {source}")]
    SagaStepFailed {
        step: usize,
        name: &'static str,
        #[source]
        source: Box<AuthError>,
    },

    /// A saga step failed and then a compensation failed too
    #[error(
        "Saga step {failed_step} failed: {original}; compensation for step {compensating_step} also failed: {compensation}"
    )]
    SagaCompensationFailed {
        failed_step: usize,
        compensating_step: usize,
        original: Box<AuthError>,
        #[source]
        compensation: Box<AuthError>,
    },

    #[error("Transaction failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<AuthError>,
    },

    /// The caller's cancellation signal fired
    #[error("Operation cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Stable machine-readable code
    ///
    /// Validation errors report the value object's own code (`INVALID_EMAIL`,
    /// `PASSWORD_REUSED`) and fall back to `VALIDATION_ERROR`.
    pub fn code(&self) -> &str {
        match self {
            AuthError::Validation(inner) if inner.code() != inner.kind().default_code() => {
                inner.code()
            }
            AuthError::Validation(_) => "VALIDATION_ERROR",
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::TokenExpired => "TOKEN_EXPIRED",
            AuthError::TokenInvalid => "TOKEN_INVALID",
            AuthError::InvalidTokenType => "INVALID_TOKEN_TYPE",
            AuthError::SessionNotFound => "SESSION_NOT_FOUND",
            AuthError::InvalidSession => "INVALID_SESSION",
            AuthError::SessionUserMismatch => "SESSION_USER_MISMATCH",
            AuthError::UserNotFound => "USER_NOT_FOUND",
            AuthError::AccountLocked => "ACCOUNT_LOCKED",
            AuthError::RefreshTokenExpired => "REFRESH_TOKEN_EXPIRED",
            AuthError::Database(_) => "DATABASE_ERROR",
            AuthError::TransactionConflict(_) => "TRANSACTION_CONFLICT",
            AuthError::TokenSigning(_) => "TOKEN_GENERATION_FAILED",
            AuthError::KeyConfiguration(_) => "INVALID_KEY_CONFIGURATION",
            AuthError::PasswordHashing(_) => "PASSWORD_HASH_FAILED",
            AuthError::TransactionFailed { code, .. } => *code,
            AuthError::BatchFailed { .. } => "BATCH_FAILED",
            AuthError::SagaStepFailed { .. } => "SAGA_STEP_FAILED",
            AuthError::SagaCompensationFailed { .. } => "SAGA_COMPENSATION_FAILED",
            AuthError::RetriesExhausted { .. } => "RETRIES_EXHAUSTED",
            AuthError::Cancelled => "OPERATION_CANCELLED",
            AuthError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Taxonomy bucket
    pub fn category(&self) -> ErrorCategory {
        match self {
            AuthError::Validation(_) => ErrorCategory::Validation,
            AuthError::InvalidCredentials
            | AuthError::TokenExpired
            | AuthError::TokenInvalid
            | AuthError::InvalidTokenType
            | AuthError::SessionNotFound
            | AuthError::InvalidSession
            | AuthError::SessionUserMismatch => ErrorCategory::Auth,
            AuthError::UserNotFound | AuthError::AccountLocked | AuthError::RefreshTokenExpired => {
                ErrorCategory::Business
            }
            AuthError::Database(_)
            | AuthError::TransactionConflict(_)
            | AuthError::TokenSigning(_)
            | AuthError::KeyConfiguration(_)
            | AuthError::PasswordHashing(_)
            | AuthError::TransactionFailed { .. }
            | AuthError::BatchFailed { .. }
            | AuthError::SagaStepFailed { .. }
            | AuthError::SagaCompensationFailed { .. }
            | AuthError::RetriesExhausted { .. }
            | AuthError::Cancelled
            | AuthError::Internal(_) => ErrorCategory::System,
        }
    }

    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::Cancelled => ErrorKind::RequestTimeout,
            AuthError::TransactionConflict(_) | AuthError::RetriesExhausted { .. } => {
                ErrorKind::ServiceUnavailable
            }
            AuthError::Database(e) => kernel::error::conversions::classify_sqlx(e).kind(),
            _ => self.category().default_kind(),
        }
    }

    /// Whether re-running the surrounding transaction may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            AuthError::TransactionConflict(_) => true,
            AuthError::Database(e) => kernel::error::conversions::is_retryable_sqlx(e),
            AuthError::TransactionFailed { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// Wrap a failure that forced a unit of work to roll back
    ///
    /// Cancellation passes through untouched.
    pub fn rolled_back(code: &'static str, source: AuthError) -> Self {
        match source {
            AuthError::Cancelled | AuthError::TransactionFailed { .. } => source,
            other => AuthError::TransactionFailed {
                code,
                source: Box::new(other),
            },
        }
    }

    /// Like [`AuthError::rolled_back`] but only for system-category failures;
    /// domain errors raised inside the unit of work surface unchanged.
    pub fn rolled_back_if_system(self, code: &'static str) -> Self {
        if self.category() == ErrorCategory::System {
            AuthError::rolled_back(code, self)
        } else {
            self
        }
    }

    /// Convert to AppError
    pub fn to_app_error(&self) -> AppError {
        let app = match self {
            AuthError::Validation(inner) => {
                let app = AppError::new(inner.kind(), inner.message().to_string());
                match inner.action() {
                    Some(action) => app.with_action(action.to_string()),
                    None => app,
                }
            }
            // Internal detail stays in the logs
            _ if self.category() == ErrorCategory::System => {
                AppError::new(self.kind(), "An internal error occurred")
            }
            _ => AppError::new(self.kind(), self.to_string()),
        };

        app.with_code(self.code().to_string())
            .with_category(self.category())
    }

    /// Log the error with appropriate level
    pub fn log(&self) {
        match self {
            AuthError::Database(e) => {
                tracing::error!(error = %e, "Auth database error");
            }
            AuthError::Internal(msg) => {
                tracing::error!(message = %msg, "Auth internal error");
            }
            AuthError::SagaCompensationFailed { .. } => {
                tracing::error!(error = %self, "Saga compensation failed");
            }
            AuthError::InvalidCredentials => {
                tracing::warn!("Invalid login attempt");
            }
            AuthError::AccountLocked => {
                tracing::warn!("Login attempt on locked account");
            }
            AuthError::SessionUserMismatch => {
                tracing::warn!("Session accessed by a different user");
            }
            _ if self.category() == ErrorCategory::System => {
                tracing::error!(code = self.code(), error = %self, "Auth system error");
            }
            _ => {
                tracing::debug!(code = self.code(), error = %self, "Auth error");
            }
        }
    }
}

impl From<AppError> for AuthError {
    fn from(err: AppError) -> Self {
        match err.category() {
            ErrorCategory::Validation => AuthError::Validation(err),
            _ => AuthError::Internal(err.to_string()),
        }
    }
}

impl From<platform::password::PasswordHashError> for AuthError {
    fn from(err: platform::password::PasswordHashError) -> Self {
        AuthError::PasswordHashing(err.to_string())
    }
}
