//! User repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

use davila_core::verification::LoginGuard;
use davila_core::{Email, UserId};

use super::{RepositoryError, map_write_error};
use crate::models::user::User;

const USER_COLUMNS: &str = r"
    id, email, password_hash, nombre, apellidos, direccion,
    is_active, is_staff, is_verified, puede_ver_precios, puede_ver_precios_mayoreo,
    failed_login_attempts, blocked_until, last_login, created_at, updated_at
";

/// Fields for a new account.
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub email: &'a Email,
    pub password_hash: &'a str,
    pub nombre: Option<&'a str>,
    pub apellidos: Option<&'a str>,
    pub is_staff: bool,
    pub is_verified: bool,
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM tienda.user WHERE LOWER(email) = LOWER($1)"
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM tienda.user WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Whether an account already uses `email`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn email_exists(&self, email: &Email) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM tienda.user WHERE LOWER(email) = LOWER($1))",
        )
        .bind(email)
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }

    /// Create an account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Duplicate` if the email already exists.
    pub async fn create(&self, new: &NewUser<'_>) -> Result<User, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        insert(&mut *conn, new).await
    }

    /// Create an account inside an existing transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Duplicate` if the email already exists.
    pub async fn create_in(
        tx: &mut Transaction<'_, Postgres>,
        new: &NewUser<'_>,
    ) -> Result<User, RepositoryError> {
        insert(&mut **tx, new).await
    }

    /// List customer accounts (non-staff), oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_customers(&self) -> Result<Vec<User>, RepositoryError> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM tienda.user WHERE NOT is_staff ORDER BY id"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(users)
    }

    /// Persist the login counters and optionally stamp a successful login.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn save_login_state(
        &self,
        id: UserId,
        guard: LoginGuard,
        logged_in_at: Option<DateTime<Utc>>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            UPDATE tienda.user
            SET failed_login_attempts = $2,
                blocked_until = $3,
                last_login = COALESCE($4, last_login),
                updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(guard.failed_attempts)
        .bind(guard.blocked_until)
        .bind(logged_in_at)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Replace the password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn set_password_hash(&self, id: UserId, hash: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE tienda.user SET password_hash = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(hash)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Update the editable profile fields. `None` leaves a field unchanged.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn update_profile(
        &self,
        id: UserId,
        nombre: Option<&str>,
        apellidos: Option<&str>,
        direccion: Option<&str>,
    ) -> Result<User, RepositoryError> {
        sqlx::query_as::<_, User>(&format!(
            r"
            UPDATE tienda.user
            SET nombre = COALESCE($2, nombre),
                apellidos = COALESCE($3, apellidos),
                direccion = COALESCE($4, direccion),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(nombre)
        .bind(apellidos)
        .bind(direccion)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Grant or revoke the retail price permission.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn set_price_access(&self, id: UserId, allowed: bool) -> Result<User, RepositoryError> {
        self.update_flag(id, "puede_ver_precios", allowed).await
    }

    /// Grant or revoke the wholesale price permission.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn set_wholesale_access(
        &self,
        id: UserId,
        allowed: bool,
    ) -> Result<User, RepositoryError> {
        self.update_flag(id, "puede_ver_precios_mayoreo", allowed)
            .await
    }

    /// Activate or deactivate an account. Either way the lockout is cleared;
    /// reactivation also resets the failure counter.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn set_active(&self, id: UserId, active: bool) -> Result<User, RepositoryError> {
        sqlx::query_as::<_, User>(&format!(
            r"
            UPDATE tienda.user
            SET is_active = $2,
                blocked_until = NULL,
                failed_login_attempts = CASE WHEN $2 THEN 0 ELSE failed_login_attempts END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(active)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    async fn update_flag(
        &self,
        id: UserId,
        column: &'static str,
        value: bool,
    ) -> Result<User, RepositoryError> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE tienda.user SET {column} = $2, updated_at = NOW() WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(value)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }
}

async fn insert(
    conn: &mut sqlx::PgConnection,
    new: &NewUser<'_>,
) -> Result<User, RepositoryError> {
    sqlx::query_as::<_, User>(&format!(
        r"
        INSERT INTO tienda.user (email, password_hash, nombre, apellidos, is_staff, is_verified)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {USER_COLUMNS}
        "
    ))
    .bind(new.email)
    .bind(new.password_hash)
    .bind(new.nombre)
    .bind(new.apellidos)
    .bind(new.is_staff)
    .bind(new.is_verified)
    .fetch_one(conn)
    .await
    .map_err(|e| map_write_error("user", e))
}
