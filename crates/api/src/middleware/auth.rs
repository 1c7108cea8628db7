//! Authentication extractors and auth cookies.
//!
//! Access tokens are read from `Authorization: Bearer ...` first and from the
//! `access_token` cookie second. The user is reloaded from the database on
//! every request, so deactivating an account takes effect immediately.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, HeaderValue, header, request::Parts},
};
use cookie::{Cookie, SameSite, time::Duration as CookieDuration};

use crate::db::UserRepository;
use crate::error::{AppError, set_sentry_user};
use crate::models::user::User;
use crate::services::tokens::{ACCESS_TOKEN_TTL, REFRESH_TOKEN_TTL, TokenKind, TokenPair};
use crate::state::AppState;

/// Cookie carrying the access token.
pub const ACCESS_COOKIE: &str = "access_token";

/// Cookie carrying the refresh token.
pub const REFRESH_COOKIE: &str = "refresh_token";

const NOT_AUTHENTICATED: &str = "No se proporcionaron las credenciales de autenticación.";

/// Extractor that requires a valid access token for an active user.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hola, {}!", user.email)
/// }
/// ```
pub struct RequireAuth(pub User);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = request_token(&parts.headers)
            .ok_or_else(|| AppError::Unauthorized(NOT_AUTHENTICATED.to_string()))?;
        let user = authenticate(state, &token).await?;
        Ok(Self(user))
    }
}

/// Extractor that requires an authenticated staff user.
///
/// Anonymous requests get 401, authenticated non-staff users get 403.
pub struct RequireAdmin(pub User);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAuth(user) = RequireAuth::from_request_parts(parts, state).await?;
        if !user.is_staff {
            return Err(AppError::Forbidden(
                "No tiene permiso para realizar esta acción.".to_string(),
            ));
        }
        Ok(Self(user))
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireAuth`, a missing or invalid token yields `None` instead of
/// rejecting the request. Database failures still surface as errors.
pub struct OptionalAuth(pub Option<User>);

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = request_token(&parts.headers) else {
            return Ok(Self(None));
        };
        match authenticate(state, &token).await {
            Ok(user) => Ok(Self(Some(user))),
            Err(AppError::Token(_) | AppError::Unauthorized(_)) => Ok(Self(None)),
            Err(e) => Err(e),
        }
    }
}

async fn authenticate(state: &AppState, token: &str) -> Result<User, AppError> {
    let claims = state.tokens().verify(token, TokenKind::Access)?;
    let user_id = claims.user_id()?;

    let user = UserRepository::new(state.pool())
        .get_by_id(user_id)
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(|| {
            AppError::Unauthorized("Usuario no encontrado o inactivo.".to_string())
        })?;

    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(user)
}

/// Access token from the `Authorization` header or the access cookie.
fn request_token(headers: &HeaderMap) -> Option<String> {
    bearer_token(headers).or_else(|| cookie_value(headers, ACCESS_COOKIE))
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| token.to_string())
}

/// Value of the cookie `name` in the request's `Cookie` headers.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value().to_string())
}

fn auth_cookie(name: &'static str, value: String, max_age: CookieDuration, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(max_age)
        .build()
}

/// `Set-Cookie` values storing a freshly issued token pair.
#[must_use]
pub fn login_cookies(tokens: &TokenPair, secure: bool) -> [HeaderValue; 2] {
    [
        set_cookie(&auth_cookie(
            ACCESS_COOKIE,
            tokens.access.clone(),
            CookieDuration::seconds(ACCESS_TOKEN_TTL.num_seconds()),
            secure,
        )),
        set_cookie(&auth_cookie(
            REFRESH_COOKIE,
            tokens.refresh.clone(),
            CookieDuration::seconds(REFRESH_TOKEN_TTL.num_seconds()),
            secure,
        )),
    ]
}

/// `Set-Cookie` values expiring both auth cookies.
#[must_use]
pub fn logout_cookies(secure: bool) -> [HeaderValue; 2] {
    [ACCESS_COOKIE, REFRESH_COOKIE]
        .map(|name| set_cookie(&auth_cookie(name, String::new(), CookieDuration::ZERO, secure)))
}

fn set_cookie(cookie: &Cookie<'_>) -> HeaderValue {
    // Token values are base64url and cookie attributes are ASCII.
    HeaderValue::from_str(&cookie.to_string()).unwrap_or_else(|_| HeaderValue::from_static(""))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn headers(pairs: &[(header::HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_bearer_token_parsing() {
        let map = headers(&[(header::AUTHORIZATION, "Bearer abc.def.ghi")]);
        assert_eq!(bearer_token(&map).as_deref(), Some("abc.def.ghi"));

        let map = headers(&[(header::AUTHORIZATION, "bearer   tok ")]);
        assert_eq!(bearer_token(&map).as_deref(), Some("tok"));

        let map = headers(&[(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")]);
        assert_eq!(bearer_token(&map), None);

        let map = headers(&[(header::AUTHORIZATION, "Bearer ")]);
        assert_eq!(bearer_token(&map), None);
    }

    #[test]
    fn test_cookie_fallback() {
        let map = headers(&[(header::COOKIE, "theme=dark; access_token=from-cookie")]);
        assert_eq!(request_token(&map).as_deref(), Some("from-cookie"));

        let map = headers(&[
            (header::AUTHORIZATION, "Bearer from-header"),
            (header::COOKIE, "access_token=from-cookie"),
        ]);
        assert_eq!(request_token(&map).as_deref(), Some("from-header"));

        assert_eq!(request_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_login_cookies_attributes() {
        let pair = TokenPair {
            access: "aaa".to_string(),
            refresh: "rrr".to_string(),
        };
        let [access, refresh] = login_cookies(&pair, false);
        let access = access.to_str().unwrap();
        assert!(access.starts_with("access_token=aaa"));
        assert!(access.contains("HttpOnly"));
        assert!(access.contains("SameSite=Lax"));
        assert!(access.contains("Max-Age=3600"));
        assert!(!access.contains("Secure"));

        let refresh = refresh.to_str().unwrap();
        assert!(refresh.starts_with("refresh_token=rrr"));
        assert!(refresh.contains("Max-Age=604800"));
    }

    #[test]
    fn test_logout_cookies_expire() {
        for value in logout_cookies(true) {
            let value = value.to_str().unwrap();
            assert!(value.contains("Max-Age=0"));
            assert!(value.contains("Secure"));
        }
    }
}
