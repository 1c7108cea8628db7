//! Authentication error types.

use chrono::{DateTime, Utc};
use thiserror::Error;

use davila_core::verification::CodeError;

use crate::db::RepositoryError;
use crate::services::email::MailError;

/// Errors that can occur during registration, login and password reset.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] davila_core::EmailError),

    /// Email and code are both required to verify.
    #[error("email and code are required")]
    MissingVerificationFields,

    /// The two password fields differ.
    #[error("passwords do not match")]
    PasswordMismatch,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// A verified account already uses the email.
    #[error("user already exists")]
    UserAlreadyExists,

    /// No pending registration for the email.
    #[error("pending registration not found")]
    PendingNotFound,

    /// Submitted verification code was not accepted.
    #[error(transparent)]
    Code(#[from] CodeError),

    /// Resend limit for the current window is exhausted.
    #[error("resend limit reached")]
    ResendLimitReached,

    /// Too soon after the previous resend.
    #[error("resend cooldown: {remaining_secs}s left")]
    ResendCooldown { remaining_secs: i64 },

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Account temporarily locked after repeated failures.
    #[error("account locked until {until}")]
    Locked { until: DateTime<Utc> },

    /// Account deactivated by an administrator.
    #[error("account disabled")]
    Disabled,

    /// Account exists but was never verified.
    #[error("account not verified")]
    Unverified,

    /// User not found.
    #[error("user not found")]
    UserNotFound,

    /// Password reset link is malformed, expired or already used.
    #[error("invalid reset token")]
    InvalidResetToken,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Email could not be sent.
    #[error("mail error: {0}")]
    Mail(#[from] MailError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
