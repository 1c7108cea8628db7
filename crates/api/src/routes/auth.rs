//! Authentication route handlers.
//!
//! Registration with an emailed code, login with lockout, JWT refresh and
//! verification, and password reset by email link.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::{AppendHeaders, IntoResponse},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use crate::db::UserRepository;
use crate::error::{AppError, FieldErrors, Result};
use crate::middleware::auth::{REFRESH_COOKIE, cookie_value};
use crate::middleware::{RequireAuth, login_cookies, logout_cookies};
use crate::models::user::{LoginUser, UserInfo};
use crate::routes::extract::ValidJson;
use crate::services::auth::Registration;
use crate::services::tokens::TokenKind;
use crate::state::AppState;

// =============================================================================
// Request Types
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(required, length(max = 254))]
    pub email: Option<String>,
    #[validate(length(max = 150))]
    pub nombre: Option<String>,
    #[validate(length(max = 150))]
    pub apellidos: Option<String>,
    #[validate(required)]
    pub password: Option<String>,
    #[validate(required)]
    pub password2: Option<String>,
}

/// Verification is checked by hand so missing fields get the flow's own
/// `{"error": ...}` message.
#[derive(Debug, Deserialize, Validate)]
pub struct VerifyRequest {
    pub email: Option<String>,
    pub code: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct EmailRequest {
    #[validate(required)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(required)]
    pub email: Option<String>,
    #[validate(required)]
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    pub refresh: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TokenVerifyRequest {
    #[validate(required)]
    pub token: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetTokenRequest {
    pub uid: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetConfirmRequest {
    pub uid: Option<String>,
    pub token: Option<String>,
    pub password: Option<String>,
}

// =============================================================================
// Response Types
// =============================================================================

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: LoginUser,
    pub access: String,
    pub refresh: String,
    pub message: &'static str,
}

fn message(text: &str) -> Json<serde_json::Value> {
    Json(json!({ "message": text }))
}

// =============================================================================
// Registration
// =============================================================================

/// Start a registration and email the verification code.
#[tracing::instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<RegisterRequest>,
) -> Result<impl IntoResponse> {
    state
        .auth()
        .register(&Registration {
            email: body.email.as_deref().unwrap_or_default(),
            nombre: body.nombre.as_deref(),
            apellidos: body.apellidos.as_deref(),
            password: body.password.as_deref().unwrap_or_default(),
            password2: body.password2.as_deref().unwrap_or_default(),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        message("Se ha enviado un código de verificación a tu correo."),
    ))
}

/// Confirm the emailed code and create the account.
#[tracing::instrument(skip_all)]
pub async fn verify(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<VerifyRequest>,
) -> Result<impl IntoResponse> {
    state
        .auth()
        .verify(
            body.email.as_deref().unwrap_or_default(),
            body.code.as_deref().unwrap_or_default(),
        )
        .await?;

    Ok(message("Cuenta verificada y creada correctamente."))
}

/// Issue a new verification code, subject to the resend limits.
#[tracing::instrument(skip_all)]
pub async fn resend_code(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<EmailRequest>,
) -> Result<impl IntoResponse> {
    state
        .auth()
        .resend_code(body.email.as_deref().unwrap_or_default())
        .await?;

    Ok(message("Nuevo código enviado correctamente."))
}

// =============================================================================
// Login / Logout / Tokens
// =============================================================================

/// Check credentials and hand out a token pair, also as HttpOnly cookies.
#[tracing::instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<LoginRequest>,
) -> Result<impl IntoResponse> {
    let user = state
        .auth()
        .login(
            body.email.as_deref().unwrap_or_default(),
            body.password.as_deref().unwrap_or_default(),
        )
        .await?;

    let tokens = state.tokens().issue_pair(&user)?;
    let cookies = login_cookies(&tokens, state.config().secure_cookies());
    tracing::info!(user_id = %user.id, "User logged in");

    Ok((
        AppendHeaders(cookies.map(|value| (SET_COOKIE, value))),
        Json(LoginResponse {
            user: LoginUser::from(&user),
            access: tokens.access,
            refresh: tokens.refresh,
            message: "Inicio de sesión exitoso.",
        }),
    ))
}

/// Clear the auth cookies.
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    let cookies = logout_cookies(state.config().secure_cookies());
    (
        AppendHeaders(cookies.map(|value| (SET_COOKIE, value))),
        message("Sesión cerrada."),
    )
}

/// Exchange a refresh token (body or cookie) for a new access token.
pub async fn refresh_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse> {
    let request: RefreshRequest = if body.is_empty() {
        RefreshRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::Rejected(format!("JSON inválido: {e}")))?
    };

    let refresh = request
        .refresh
        .filter(|token| !token.is_empty())
        .or_else(|| cookie_value(&headers, REFRESH_COOKIE))
        .ok_or_else(|| {
            AppError::Validation(FieldErrors::single(
                "refresh",
                "Este campo es requerido.",
            ))
        })?;

    let claims = state.tokens().refresh(&refresh)?;
    let user = UserRepository::new(state.pool())
        .get_by_id(claims.user_id()?)
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(|| AppError::Unauthorized("Usuario no encontrado o inactivo.".to_string()))?;

    let access = state.tokens().issue(&user, TokenKind::Access)?;
    Ok(Json(json!({ "access": access })))
}

/// 200 with an empty object when the token (access or refresh) is valid.
pub async fn verify_token(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<TokenVerifyRequest>,
) -> Result<impl IntoResponse> {
    let token = body.token.unwrap_or_default();
    let tokens = state.tokens();
    if tokens.verify(&token, TokenKind::Access).is_err() {
        tokens.verify(&token, TokenKind::Refresh)?;
    }
    Ok(Json(json!({})))
}

/// The authenticated user's basic data.
pub async fn user_info(RequireAuth(user): RequireAuth) -> Json<UserInfo> {
    Json(UserInfo::from(&user))
}

// =============================================================================
// Password Reset
// =============================================================================

/// Email a password reset link.
#[tracing::instrument(skip_all)]
pub async fn request_password_reset(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<EmailRequest>,
) -> Result<impl IntoResponse> {
    state
        .auth()
        .request_password_reset(
            body.email.as_deref().unwrap_or_default(),
            &state.config().frontend_url,
        )
        .await?;

    Ok(message("Correo de recuperación enviado."))
}

/// Check a reset link before showing the new-password form.
pub async fn validate_reset_token(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<ResetTokenRequest>,
) -> Result<impl IntoResponse> {
    state
        .auth()
        .validate_reset(
            body.uid.as_deref().unwrap_or_default(),
            body.token.as_deref().unwrap_or_default(),
        )
        .await?;

    Ok(Json(json!({ "valid": true })))
}

/// Set a new password through a reset link.
#[tracing::instrument(skip_all)]
pub async fn confirm_password_reset(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<ResetConfirmRequest>,
) -> Result<impl IntoResponse> {
    let password = body.password.unwrap_or_default();
    if password.is_empty() {
        return Err(AppError::BadRequest(
            "Debe ingresar una nueva contraseña.".to_string(),
        ));
    }

    state
        .auth()
        .confirm_reset(
            body.uid.as_deref().unwrap_or_default(),
            body.token.as_deref().unwrap_or_default(),
            &password,
        )
        .await?;

    Ok(message("Contraseña restablecida correctamente."))
}
