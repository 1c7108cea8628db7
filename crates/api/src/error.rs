//! Unified error handling with Sentry integration.
//!
//! Every handler returns `Result<T, AppError>`. Server-side failures are
//! captured to Sentry and reported to the client as a generic message; all
//! other errors become one of three JSON shapes the frontend understands:
//!
//! - `{"field": ["message", ...]}` for field validation
//! - `{"error": "message"}` for registration and verification flows
//! - `{"detail": "message"}` for everything else

use std::collections::BTreeMap;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use davila_core::verification::CodeError;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::checkout::CheckoutError;
use crate::services::email::MailError;
use crate::services::media::MediaError;
use crate::services::tokens::TokenError;

/// Field name to messages, serialized as a flat JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A single message for a single field.
    #[must_use]
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_owned())
            .or_default()
            .push(message.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Return `Err` with these errors if any were recorded.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` when not empty.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self))
        }
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }
}

impl From<validator::ValidationErrors> for FieldErrors {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut out = Self::new();
        for (field, list) in errors.field_errors() {
            for error in list {
                let message = error
                    .message
                    .as_ref()
                    .map_or_else(|| default_message(&error.code), ToString::to_string);
                out.add(&field, message);
            }
        }
        out
    }
}

fn default_message(code: &str) -> String {
    match code {
        "required" => "Este campo es requerido.".to_string(),
        "email" => "Introduzca una dirección de correo electrónico válida.".to_string(),
        "length" => "La longitud de este campo no es válida.".to_string(),
        "range" => "El valor está fuera del rango permitido.".to_string(),
        "regex" => "El formato de este campo no es válido.".to_string(),
        _ => "Valor inválido.".to_string(),
    }
}

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Token missing, invalid or expired.
    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    /// Checkout or order status change failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Image upload failed.
    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    /// Outgoing email failed.
    #[error("Mail error: {0}")]
    Mail(#[from] MailError),

    /// Request fields failed validation.
    #[error("Validation failed")]
    Validation(FieldErrors),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not allowed.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request reported as `{"error": ...}`.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Bad request reported as `{"detail": ...}`.
    #[error("Rejected: {0}")]
    Rejected(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.into())
    }
}

/// Response body shapes.
enum Body {
    Error(String),
    Detail(String),
    Fields(FieldErrors),
}

const INTERNAL: &str = "Internal server error";

impl AppError {
    /// Whether this error is a server-side failure.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        match self {
            Self::Database(e)
            | Self::Auth(AuthError::Repository(e))
            | Self::Checkout(CheckoutError::Repository(e)) => is_server_repository_error(e),
            Self::Auth(AuthError::Mail(_) | AuthError::PasswordHash)
            | Self::Token(TokenError::Signing(_))
            | Self::Checkout(CheckoutError::CodeExhausted)
            | Self::Media(MediaError::Io(_))
            | Self::Mail(_)
            | Self::Internal(_) => true,
            _ => false,
        }
    }

    fn parts(&self) -> (StatusCode, Body) {
        match self {
            Self::Database(e) => repository_parts(e),
            Self::Auth(e) => auth_parts(e),
            Self::Token(TokenError::Invalid | TokenError::WrongKind) => (
                StatusCode::UNAUTHORIZED,
                Body::Detail("El token es inválido o ha expirado.".to_string()),
            ),
            Self::Checkout(e) => checkout_parts(e),
            Self::Media(MediaError::UnsupportedType) => (
                StatusCode::BAD_REQUEST,
                Body::Fields(FieldErrors::single(
                    "imagen",
                    "Formato de imagen no soportado. Usa JPG, PNG, WEBP o GIF.",
                )),
            ),
            Self::Media(MediaError::TooLarge { .. }) => (
                StatusCode::BAD_REQUEST,
                Body::Fields(FieldErrors::single(
                    "imagen",
                    "La imagen supera el tamaño máximo permitido.",
                )),
            ),
            Self::Validation(fields) => (StatusCode::BAD_REQUEST, Body::Fields(fields.clone())),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, Body::Detail(msg.clone())),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, Body::Detail(msg.clone())),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, Body::Detail(msg.clone())),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, Body::Error(msg.clone())),
            Self::Rejected(msg) => (StatusCode::BAD_REQUEST, Body::Detail(msg.clone())),
            Self::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                Body::Detail("Demasiadas solicitudes. Intenta más tarde.".to_string()),
            ),
            Self::Token(TokenError::Signing(_))
            | Self::Media(MediaError::Io(_))
            | Self::Mail(_)
            | Self::Internal(_) => internal(),
        }
    }
}

const fn is_server_repository_error(e: &RepositoryError) -> bool {
    matches!(
        e,
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_)
    )
}

fn internal() -> (StatusCode, Body) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Body::Detail(INTERNAL.to_string()),
    )
}

fn repository_parts(e: &RepositoryError) -> (StatusCode, Body) {
    match e {
        RepositoryError::NotFound => (
            StatusCode::NOT_FOUND,
            Body::Detail("No encontrado.".to_string()),
        ),
        RepositoryError::Duplicate { field } => (
            StatusCode::BAD_REQUEST,
            Body::Fields(FieldErrors::single(
                field,
                "Ya existe un registro con este valor.",
            )),
        ),
        RepositoryError::InUse(_) => (
            StatusCode::CONFLICT,
            Body::Detail(
                "No se puede eliminar porque otros registros dependen de él.".to_string(),
            ),
        ),
        RepositoryError::Conflict(_) => (
            StatusCode::CONFLICT,
            Body::Detail("La operación entra en conflicto con los datos existentes.".to_string()),
        ),
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => internal(),
    }
}

fn auth_parts(e: &AuthError) -> (StatusCode, Body) {
    let bad = |msg: &str| (StatusCode::BAD_REQUEST, Body::Error(msg.to_string()));
    match e {
        AuthError::InvalidEmail(_) => (
            StatusCode::BAD_REQUEST,
            Body::Fields(FieldErrors::single(
                "email",
                "Introduzca una dirección de correo electrónico válida.",
            )),
        ),
        AuthError::MissingVerificationFields => bad("El correo y el código son obligatorios."),
        AuthError::PasswordMismatch => (
            StatusCode::BAD_REQUEST,
            Body::Fields(FieldErrors::single(
                "password",
                "Las contraseñas no coinciden.",
            )),
        ),
        AuthError::WeakPassword(msg) => (
            StatusCode::BAD_REQUEST,
            Body::Fields(FieldErrors::single("password", msg.clone())),
        ),
        AuthError::UserAlreadyExists => bad("El correo ya está registrado."),
        AuthError::PendingNotFound => (
            StatusCode::NOT_FOUND,
            Body::Error("No existe un usuario con ese correo.".to_string()),
        ),
        AuthError::Code(CodeError::Missing) => bad("No se ha enviado un código de verificación."),
        AuthError::Code(CodeError::Expired) => bad("El código ha expirado. Solicita uno nuevo."),
        AuthError::Code(CodeError::Mismatch) => bad("El código ingresado no es correcto."),
        AuthError::ResendLimitReached => bad("Has alcanzado el límite de 3 reenvíos por hora."),
        AuthError::ResendCooldown { remaining_secs } => bad(&format!(
            "Debes esperar {remaining_secs} segundos antes de reenviar el código."
        )),
        AuthError::InvalidCredentials => (
            StatusCode::UNAUTHORIZED,
            Body::Detail("Credenciales inválidas.".to_string()),
        ),
        AuthError::Locked { until } => (
            StatusCode::FORBIDDEN,
            Body::Detail(format!("Usuario bloqueado hasta {}", until.format("%H:%M:%S"))),
        ),
        AuthError::Disabled => (
            StatusCode::FORBIDDEN,
            Body::Detail("Tu cuenta ha sido desactivada. Contacta al administrador.".to_string()),
        ),
        AuthError::Unverified => (
            StatusCode::FORBIDDEN,
            Body::Detail("Debes verificar tu correo antes de iniciar sesión.".to_string()),
        ),
        AuthError::UserNotFound => (
            StatusCode::NOT_FOUND,
            Body::Error("Correo no encontrado.".to_string()),
        ),
        AuthError::InvalidResetToken => bad("Token inválido o expirado."),
        AuthError::Repository(e) => repository_parts(e),
        AuthError::Mail(_) | AuthError::PasswordHash => internal(),
    }
}

fn checkout_parts(e: &CheckoutError) -> (StatusCode, Body) {
    match e {
        CheckoutError::CartUnavailable => (
            StatusCode::BAD_REQUEST,
            Body::Fields(FieldErrors::single(
                "cart_id",
                "El carrito no existe o ya fue procesado.",
            )),
        ),
        CheckoutError::EmptyCart => (
            StatusCode::BAD_REQUEST,
            Body::Fields(FieldErrors::single("cart_id", "El carrito está vacío.")),
        ),
        CheckoutError::InsufficientStock(name) => (
            StatusCode::BAD_REQUEST,
            Body::Detail(format!("Stock insuficiente para {name}")),
        ),
        CheckoutError::OrderNotFound => (
            StatusCode::NOT_FOUND,
            Body::Detail("No encontrado.".to_string()),
        ),
        CheckoutError::Repository(e) => repository_parts(e),
        CheckoutError::CodeExhausted => internal(),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let (status, body) = self.parts();
        match body {
            Body::Error(error) => (status, Json(serde_json::json!({ "error": error }))).into_response(),
            Body::Detail(detail) => {
                (status, Json(serde_json::json!({ "detail": detail }))).into_response()
            }
            Body::Fields(fields) => (status, Json(fields)).into_response(),
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}
