//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ApiConfig;
use crate::services::auth::AuthService;
use crate::services::email::Mailer;
use crate::services::media::MediaStore;
use crate::services::password_reset::ResetTokens;
use crate::services::tokens::TokenService;

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("smtp configuration error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    pool: PgPool,
    tokens: TokenService,
    reset_tokens: ResetTokens,
    mailer: Mailer,
    media: MediaStore,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP relay cannot be configured.
    pub fn new(config: ApiConfig, pool: PgPool) -> Result<Self, StateError> {
        let mailer = Mailer::from_config(config.email.as_ref())?;
        Ok(Self::with_mailer(config, pool, mailer))
    }

    /// Create the state with an explicit mailer.
    #[must_use]
    pub fn with_mailer(config: ApiConfig, pool: PgPool, mailer: Mailer) -> Self {
        let tokens = TokenService::new(&config.jwt_secret);
        let reset_tokens = ResetTokens::new(config.jwt_secret.clone());
        let media = MediaStore::new(config.media_root.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                tokens,
                reset_tokens,
                mailer,
                media,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.inner.tokens
    }

    #[must_use]
    pub fn mailer(&self) -> &Mailer {
        &self.inner.mailer
    }

    #[must_use]
    pub fn media(&self) -> &MediaStore {
        &self.inner.media
    }

    /// Authentication service bound to this state's pool and mailer.
    #[must_use]
    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(&self.inner.pool, &self.inner.mailer, &self.inner.reset_tokens)
    }
}
