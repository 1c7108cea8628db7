//! Staff account management commands.
//!
//! # Usage
//!
//! ```bash
//! davila-cli admin create -e admin@davilarepuestos.pe -p 'Str0ng-Pass' -n Ana
//! ```
//!
//! # Environment Variables
//!
//! - `DAVILA_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string

use davila_api::db::users::NewUser;
use davila_api::db::{RepositoryError, UserRepository};
use davila_api::services::auth::{AuthError, hash_password, validate_password};
use davila_core::{Email, EmailError, UserId};
use thiserror::Error;

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Password rejected or could not be hashed.
    #[error("{0}")]
    Password(#[from] AuthError),

    /// User already exists.
    #[error("User already exists with email: {0}")]
    UserExists(String),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Create a verified staff user.
///
/// Staff accounts see both price columns and can use every admin route.
///
/// # Returns
///
/// The ID of the created user.
pub async fn create_user(
    email: &str,
    password: &str,
    nombre: Option<&str>,
) -> Result<UserId, AdminError> {
    let email = Email::parse(email)?;
    validate_password(password)?;

    let database_url =
        super::database_url().ok_or(AdminError::MissingEnvVar("DAVILA_DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    let pool = davila_api::db::create_pool(&database_url).await?;
    let users = UserRepository::new(&pool);

    if users.get_by_email(&email).await?.is_some() {
        return Err(AdminError::UserExists(email.to_string()));
    }

    let password_hash = hash_password(password)?;
    let user = users
        .create(&NewUser {
            email: &email,
            password_hash: &password_hash,
            nombre,
            apellidos: None,
            is_staff: true,
            is_verified: true,
        })
        .await
        .map_err(|e| match e {
            RepositoryError::Duplicate { .. } => AdminError::UserExists(email.to_string()),
            other => other.into(),
        })?;

    tracing::info!(
        "Staff user created successfully! ID: {}, Email: {}",
        user.id,
        user.email
    );

    Ok(user.id)
}
