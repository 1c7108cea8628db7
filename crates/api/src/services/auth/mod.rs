//! Authentication service.
//!
//! Registration goes through a pending record holding a 6-digit code that is
//! emailed to the user; the account is created once the code is confirmed.
//! Login enforces the lockout policy from [`davila_core::verification`].

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use sqlx::PgPool;

use davila_core::Email;
use davila_core::verification::{
    CODE_TTL, LoginGuard, ResendDecision, ResendState, check_code, generate_code,
};

use crate::db::pending_users::PendingRegistration;
use crate::db::users::NewUser;
use crate::db::{PendingUserRepository, RepositoryError, UserRepository};
use crate::models::user::User;
use crate::services::email::Mailer;
use crate::services::password_reset::{ResetTokens, decode_uid, encode_uid};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Data submitted on the registration form.
#[derive(Debug, Clone)]
pub struct Registration<'r> {
    pub email: &'r str,
    pub nombre: Option<&'r str>,
    pub apellidos: Option<&'r str>,
    pub password: &'r str,
    pub password2: &'r str,
}

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    pending: PendingUserRepository<'a>,
    mailer: &'a Mailer,
    reset_tokens: &'a ResetTokens,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, mailer: &'a Mailer, reset_tokens: &'a ResetTokens) -> Self {
        Self {
            users: UserRepository::new(pool),
            pending: PendingUserRepository::new(pool),
            mailer,
            reset_tokens,
        }
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Start a registration: store it as pending and email a code.
    ///
    /// Registering again with the same email refreshes the pending record
    /// and issues a new code.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::PasswordMismatch` or `AuthError::WeakPassword` for
    /// an unacceptable password and `AuthError::UserAlreadyExists` when a
    /// verified account already uses the email.
    pub async fn register(&self, form: &Registration<'_>) -> Result<(), AuthError> {
        let email = Email::parse(form.email)?;

        if form.password != form.password2 {
            return Err(AuthError::PasswordMismatch);
        }
        validate_password(form.password)?;

        if self.users.email_exists(&email).await? {
            return Err(AuthError::UserAlreadyExists);
        }

        let password_hash = hash_password(form.password)?;
        let code = generate_code();
        self.pending
            .upsert(&PendingRegistration {
                email: &email,
                nombre: form.nombre.unwrap_or_default(),
                apellidos: form.apellidos.unwrap_or_default(),
                password_hash: &password_hash,
                code: &code,
                expires_at: Utc::now() + CODE_TTL,
            })
            .await?;

        self.mailer.send_verification_code(&email, &code).await?;
        tracing::info!(email = %email, "Verification code sent");
        Ok(())
    }

    /// Confirm a registration code and create the account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::PendingNotFound` for an unknown email and
    /// `AuthError::Code` when the code is missing, expired or wrong.
    pub async fn verify(&self, email: &str, code: &str) -> Result<User, AuthError> {
        if email.trim().is_empty() || code.trim().is_empty() {
            return Err(AuthError::MissingVerificationFields);
        }
        let email = Email::parse(email)?;

        let pending = self
            .pending
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::PendingNotFound)?;

        check_code(
            pending.verification_code.as_deref(),
            pending.code_expires_at,
            code,
            Utc::now(),
        )?;

        let mut tx = self.pending.begin().await?;
        let user = UserRepository::create_in(
            &mut tx,
            &NewUser {
                email: &pending.email,
                password_hash: &pending.password_hash,
                nombre: Some(pending.nombre.as_str()),
                apellidos: Some(pending.apellidos.as_str()),
                is_staff: false,
                is_verified: true,
            },
        )
        .await
        .map_err(|e| match e {
            RepositoryError::Duplicate { .. } => AuthError::UserAlreadyExists,
            other => AuthError::Repository(other),
        })?;
        PendingUserRepository::delete_in(&mut tx, pending.id).await?;
        tx.commit().await.map_err(RepositoryError::from)?;

        tracing::info!(user_id = %user.id, "Account verified");
        Ok(user)
    }

    /// Issue a new code for a pending registration, subject to the resend
    /// limits.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::ResendLimitReached` or `AuthError::ResendCooldown`
    /// when the policy refuses, `AuthError::PendingNotFound` for an unknown
    /// email.
    pub async fn resend_code(&self, email: &str) -> Result<(), AuthError> {
        let email = Email::parse(email)?;
        let pending = self
            .pending
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::PendingNotFound)?;

        let now = Utc::now();
        let state = ResendState {
            resend_count: pending.resend_count,
            last_resend_time: pending.last_resend_time,
        };
        let next = match state.decide(now) {
            ResendDecision::Allowed(next) => next,
            ResendDecision::LimitReached => return Err(AuthError::ResendLimitReached),
            ResendDecision::Cooldown { remaining_secs } => {
                return Err(AuthError::ResendCooldown { remaining_secs });
            }
        };

        let code = generate_code();
        self.pending
            .store_resent_code(pending.id, &code, now + CODE_TTL, next)
            .await?;
        self.mailer.send_verification_code(&email, &code).await?;

        tracing::info!(email = %email, resend_count = next.resend_count, "Verification code resent");
        Ok(())
    }

    // =========================================================================
    // Login
    // =========================================================================

    /// Check credentials, applying the lockout policy.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Locked` while the account is locked,
    /// `AuthError::InvalidCredentials` for a wrong email or password, and
    /// `AuthError::Disabled` / `AuthError::Unverified` for accounts that may
    /// not log in.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;
        let user = self
            .users
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let now = Utc::now();
        let guard = user.login_guard();
        if guard.locked_for(now).is_some() {
            return Err(AuthError::Locked {
                until: guard.blocked_until.unwrap_or(now),
            });
        }

        let password_ok = verify_password(password, &user.password_hash).is_ok();
        if !password_ok {
            let next = guard.after_failure(now);
            self.users.save_login_state(user.id, next, None).await?;
            if next.blocked_until != guard.blocked_until {
                tracing::warn!(user_id = %user.id, "Account locked after repeated login failures");
            }
        }
        admit(&user, password_ok)?;

        self.users
            .save_login_state(user.id, LoginGuard::cleared(), Some(now))
            .await?;

        let mut user = user;
        user.failed_login_attempts = 0;
        user.blocked_until = None;
        user.last_login = Some(now);
        Ok(user)
    }

    // =========================================================================
    // Password reset
    // =========================================================================

    /// Email a password reset link pointing at the frontend.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` for an unknown email.
    pub async fn request_password_reset(
        &self,
        email: &str,
        frontend_url: &str,
    ) -> Result<(), AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::UserNotFound)?;
        let user = self
            .users
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let token = self.reset_tokens.make(&user, Utc::now());
        let url = format!(
            "{}/reset-password?uid={}&token={token}",
            frontend_url.trim_end_matches('/'),
            encode_uid(user.id)
        );
        self.mailer.send_password_reset(&user.email, &url).await?;

        tracing::info!(user_id = %user.id, "Password reset link sent");
        Ok(())
    }

    /// Resolve a reset link to its user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidResetToken` for an unknown uid or a token
    /// that does not verify.
    pub async fn validate_reset(&self, uid: &str, token: &str) -> Result<User, AuthError> {
        let id = decode_uid(uid).ok_or(AuthError::InvalidResetToken)?;
        let user = self
            .users
            .get_by_id(id)
            .await?
            .ok_or(AuthError::InvalidResetToken)?;

        if !self.reset_tokens.check(&user, token, Utc::now()) {
            return Err(AuthError::InvalidResetToken);
        }
        Ok(user)
    }

    /// Set a new password through a reset link.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidResetToken` for a bad link and
    /// `AuthError::WeakPassword` for an unacceptable password.
    pub async fn confirm_reset(
        &self,
        uid: &str,
        token: &str,
        password: &str,
    ) -> Result<(), AuthError> {
        let user = self.validate_reset(uid, token).await?;
        validate_password(password)?;

        let hash = hash_password(password)?;
        self.users.set_password_hash(user.id, &hash).await?;

        tracing::info!(user_id = %user.id, "Password reset completed");
        Ok(())
    }
}

/// Validate password requirements.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` describing the first rule broken.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "La contraseña debe tener al menos {MIN_PASSWORD_LENGTH} caracteres."
        )));
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err(AuthError::WeakPassword(
            "La contraseña no puede ser completamente numérica.".to_string(),
        ));
    }
    Ok(())
}

/// Account state checks, made only once the password is known to be right so
/// a disabled or unverified account looks like any other failed login.
fn admit(user: &User, password_ok: bool) -> Result<(), AuthError> {
    if !password_ok {
        return Err(AuthError::InvalidCredentials);
    }
    if !user.is_active {
        return Err(AuthError::Disabled);
    }
    if !user.is_verified {
        return Err(AuthError::Unverified);
    }
    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use davila_core::UserId;

    use super::*;

    fn user(is_active: bool, is_verified: bool) -> User {
        let now = Utc::now();
        User {
            id: UserId::new(11),
            email: Email::parse("luis@example.com").unwrap(),
            password_hash: String::new(),
            nombre: Some("Luis".to_string()),
            apellidos: None,
            direccion: None,
            is_active,
            is_staff: false,
            is_verified,
            puede_ver_precios: false,
            puede_ver_precios_mayoreo: false,
            failed_login_attempts: 0,
            blocked_until: None,
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_account_state_is_hidden_behind_wrong_password() {
        assert!(matches!(
            admit(&user(false, true), false),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            admit(&user(true, false), false),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            admit(&user(false, true), true),
            Err(AuthError::Disabled)
        ));
        assert!(matches!(
            admit(&user(true, false), true),
            Err(AuthError::Unverified)
        ));
        assert!(admit(&user(true, true), true).is_ok());
    }

    #[test]
    fn test_validate_password_rules() {
        assert!(validate_password("corta").is_err());
        assert!(validate_password("12345678").is_err());
        assert!(validate_password("moto-2025").is_ok());
        assert!(validate_password("ñandú123").is_ok());
    }

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("repuesto-seguro").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("repuesto-seguro", &hash).is_ok());
        assert!(matches!(
            verify_password("otra-clave", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_verify_against_garbage_hash_is_invalid_credentials() {
        assert!(matches!(
            verify_password("whatever", "not-a-hash"),
            Err(AuthError::InvalidCredentials)
        ));
    }
}
