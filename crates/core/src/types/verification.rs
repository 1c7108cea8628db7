//! Account verification and login lockout rules.
//!
//! These are pure functions over timestamps and counters so the service
//! layer can load a row, ask what to do, and persist the outcome.

use chrono::{DateTime, TimeDelta, Utc};
use rand::Rng;

/// How long a verification code stays valid.
pub const CODE_TTL: TimeDelta = TimeDelta::minutes(10);
/// Minimum time between two resends.
pub const RESEND_COOLDOWN: TimeDelta = TimeDelta::seconds(60);
/// Window over which resends are counted.
pub const RESEND_WINDOW: TimeDelta = TimeDelta::hours(1);
/// Resends allowed inside one window.
pub const MAX_RESENDS_PER_WINDOW: i32 = 3;
/// Consecutive failed logins that trigger a lock.
pub const MAX_FAILED_LOGINS: i32 = 3;
/// How long a locked account stays locked.
pub const LOCKOUT_DURATION: TimeDelta = TimeDelta::minutes(15);

/// Generate a random 6-digit verification code.
#[must_use]
pub fn generate_code() -> String {
    rand::rng().random_range(100_000..1_000_000).to_string()
}

/// Why a submitted code was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CodeError {
    #[error("no verification code has been issued")]
    Missing,
    #[error("verification code has expired")]
    Expired,
    #[error("verification code does not match")]
    Mismatch,
}

/// Check a submitted code against the stored one.
///
/// Both sides are trimmed before comparison.
///
/// # Errors
///
/// Returns [`CodeError`] when no code is stored, it has expired, or it does
/// not match.
pub fn check_code(
    stored: Option<&str>,
    expires_at: Option<DateTime<Utc>>,
    submitted: &str,
    now: DateTime<Utc>,
) -> Result<(), CodeError> {
    let stored = stored.ok_or(CodeError::Missing)?;
    if expires_at.is_some_and(|at| now > at) {
        return Err(CodeError::Expired);
    }
    if stored.trim() != submitted.trim() {
        return Err(CodeError::Mismatch);
    }
    Ok(())
}

/// Resend bookkeeping stored on a pending registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResendState {
    pub resend_count: i32,
    pub last_resend_time: Option<DateTime<Utc>>,
}

/// Outcome of asking for a new code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResendDecision {
    /// Issue a code and persist the new state.
    Allowed(ResendState),
    /// Too many resends inside the window.
    LimitReached,
    /// Too soon after the previous resend.
    Cooldown { remaining_secs: i64 },
}

impl ResendState {
    /// Decide whether a new code may be sent at `now`.
    #[must_use]
    pub fn decide(self, now: DateTime<Utc>) -> ResendDecision {
        let mut count = self.resend_count;

        if let Some(last) = self.last_resend_time {
            let elapsed = now - last;
            if elapsed < RESEND_WINDOW {
                if count >= MAX_RESENDS_PER_WINDOW {
                    return ResendDecision::LimitReached;
                }
            } else {
                count = 0;
            }
            if elapsed < RESEND_COOLDOWN {
                return ResendDecision::Cooldown {
                    remaining_secs: (RESEND_COOLDOWN - elapsed).num_seconds().max(1),
                };
            }
        } else {
            count = 0;
        }

        ResendDecision::Allowed(Self {
            resend_count: count + 1,
            last_resend_time: Some(now),
        })
    }
}

/// Login counters stored on a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginGuard {
    pub failed_attempts: i32,
    pub blocked_until: Option<DateTime<Utc>>,
}

impl LoginGuard {
    /// Remaining lock time if the account is locked at `now`.
    #[must_use]
    pub fn locked_for(self, now: DateTime<Utc>) -> Option<TimeDelta> {
        self.blocked_until
            .filter(|until| *until > now)
            .map(|until| until - now)
    }

    /// State after a wrong password. Reaching the limit locks the account
    /// and resets the counter.
    #[must_use]
    pub fn after_failure(self, now: DateTime<Utc>) -> Self {
        let attempts = self.failed_attempts + 1;
        if attempts >= MAX_FAILED_LOGINS {
            Self {
                failed_attempts: 0,
                blocked_until: Some(now + LOCKOUT_DURATION),
            }
        } else {
            Self {
                failed_attempts: attempts,
                blocked_until: self.blocked_until,
            }
        }
    }

    /// State after a successful login.
    #[must_use]
    pub const fn cleared() -> Self {
        Self {
            failed_attempts: 0,
            blocked_until: None,
        }
    }
}
