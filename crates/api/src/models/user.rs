//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use davila_core::verification::LoginGuard;
use davila_core::{Email, PendingUserId, UserId, Viewer};

/// A store account.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub password_hash: String,
    pub nombre: Option<String>,
    pub apellidos: Option<String>,
    pub direccion: Option<String>,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_verified: bool,
    pub puede_ver_precios: bool,
    pub puede_ver_precios_mayoreo: bool,
    pub failed_login_attempts: i32,
    pub blocked_until: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Pricing-relevant view of this user.
    #[must_use]
    pub const fn viewer(&self) -> Viewer {
        Viewer {
            is_staff: self.is_staff,
            can_see_prices: self.puede_ver_precios,
            can_see_wholesale: self.puede_ver_precios_mayoreo,
        }
    }

    #[must_use]
    pub const fn login_guard(&self) -> LoginGuard {
        LoginGuard {
            failed_attempts: self.failed_login_attempts,
            blocked_until: self.blocked_until,
        }
    }
}

/// Account fields exposed to admins and to the account owner.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: UserId,
    pub email: Email,
    pub nombre: Option<String>,
    pub apellidos: Option<String>,
    pub direccion: Option<String>,
    pub is_active: bool,
    pub is_staff: bool,
    pub puede_ver_precios: bool,
    pub puede_ver_precios_mayoreo: bool,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            nombre: user.nombre.clone(),
            apellidos: user.apellidos.clone(),
            direccion: user.direccion.clone(),
            is_active: user.is_active,
            is_staff: user.is_staff,
            puede_ver_precios: user.puede_ver_precios,
            puede_ver_precios_mayoreo: user.puede_ver_precios_mayoreo,
        }
    }
}

/// User summary returned on login.
#[derive(Debug, Clone, Serialize)]
pub struct LoginUser {
    pub email: Email,
    pub nombre: Option<String>,
    pub apellidos: Option<String>,
    pub is_staff: bool,
    pub puede_ver_precios_mayoreo: bool,
}

impl From<&User> for LoginUser {
    fn from(user: &User) -> Self {
        Self {
            email: user.email.clone(),
            nombre: user.nombre.clone(),
            apellidos: user.apellidos.clone(),
            is_staff: user.is_staff,
            puede_ver_precios_mayoreo: user.puede_ver_precios_mayoreo,
        }
    }
}

/// Payload of `GET /api/user-info`.
#[derive(Debug, Clone, Serialize)]
pub struct UserInfo {
    pub email: Email,
    pub nombre: Option<String>,
    pub apellidos: Option<String>,
    pub is_staff: bool,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            email: user.email.clone(),
            nombre: user.nombre.clone(),
            apellidos: user.apellidos.clone(),
            is_staff: user.is_staff,
        }
    }
}

/// A registration waiting for its email code.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PendingUser {
    pub id: PendingUserId,
    pub email: Email,
    pub nombre: String,
    pub apellidos: String,
    pub password_hash: String,
    pub verification_code: Option<String>,
    pub code_expires_at: Option<DateTime<Utc>>,
    pub resend_count: i32,
    pub last_resend_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
