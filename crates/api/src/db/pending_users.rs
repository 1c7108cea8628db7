//! Pending registrations awaiting email verification.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

use davila_core::verification::ResendState;
use davila_core::{Email, PendingUserId};

use super::RepositoryError;
use crate::models::user::PendingUser;

const PENDING_COLUMNS: &str = r"
    id, email, nombre, apellidos, password_hash, verification_code,
    code_expires_at, resend_count, last_resend_time, created_at
";

/// Registration data stored until the email is verified.
#[derive(Debug, Clone)]
pub struct PendingRegistration<'a> {
    pub email: &'a Email,
    pub nombre: &'a str,
    pub apellidos: &'a str,
    pub password_hash: &'a str,
    pub code: &'a str,
    pub expires_at: DateTime<Utc>,
}

pub struct PendingUserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PendingUserRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<PendingUser>, RepositoryError> {
        let pending = sqlx::query_as::<_, PendingUser>(&format!(
            "SELECT {PENDING_COLUMNS} FROM tienda.pending_user WHERE LOWER(email) = LOWER($1)"
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        Ok(pending)
    }

    /// Insert a registration, or refresh an existing one for the same email
    /// with the new data and code. Resend bookkeeping starts over.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert(
        &self,
        registration: &PendingRegistration<'_>,
    ) -> Result<PendingUser, RepositoryError> {
        let pending = sqlx::query_as::<_, PendingUser>(&format!(
            r"
            INSERT INTO tienda.pending_user
                (email, nombre, apellidos, password_hash, verification_code, code_expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (email) DO UPDATE SET
                nombre = EXCLUDED.nombre,
                apellidos = EXCLUDED.apellidos,
                password_hash = EXCLUDED.password_hash,
                verification_code = EXCLUDED.verification_code,
                code_expires_at = EXCLUDED.code_expires_at,
                resend_count = 0,
                last_resend_time = NULL
            RETURNING {PENDING_COLUMNS}
            "
        ))
        .bind(registration.email)
        .bind(registration.nombre)
        .bind(registration.apellidos)
        .bind(registration.password_hash)
        .bind(registration.code)
        .bind(registration.expires_at)
        .fetch_one(self.pool)
        .await?;

        Ok(pending)
    }

    /// Store a freshly issued code together with the resend bookkeeping.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the registration is gone.
    pub async fn store_resent_code(
        &self,
        id: PendingUserId,
        code: &str,
        expires_at: DateTime<Utc>,
        state: ResendState,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE tienda.pending_user
            SET verification_code = $2,
                code_expires_at = $3,
                resend_count = $4,
                last_resend_time = $5
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(code)
        .bind(expires_at)
        .bind(state.resend_count)
        .bind(state.last_resend_time)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Delete a registration inside the transaction that creates the account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_in(
        tx: &mut Transaction<'_, Postgres>,
        id: PendingUserId,
    ) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM tienda.pending_user WHERE id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    /// Begin a transaction on the underlying pool.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if no connection is available.
    pub async fn begin(&self) -> Result<Transaction<'static, Postgres>, RepositoryError> {
        Ok(self.pool.begin().await?)
    }
}
