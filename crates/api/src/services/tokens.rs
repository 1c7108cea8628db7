//! Access and refresh tokens (HS256 JWT).

use chrono::{TimeDelta, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use davila_core::UserId;

use crate::models::user::User;

/// Lifetime of an access token.
pub const ACCESS_TOKEN_TTL: TimeDelta = TimeDelta::minutes(60);
/// Lifetime of a refresh token.
pub const REFRESH_TOKEN_TTL: TimeDelta = TimeDelta::days(7);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub nombre: Option<String>,
    pub apellidos: Option<String>,
    pub token_type: TokenKind,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    /// The user this token was issued to.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Invalid` if the subject is not a user id.
    pub fn user_id(&self) -> Result<UserId, TokenError> {
        self.sub
            .parse::<i32>()
            .map(UserId::new)
            .map_err(|_| TokenError::Invalid)
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token is invalid or expired")]
    Invalid,
    #[error("wrong token type")]
    WrongKind,
    #[error("failed to sign token: {0}")]
    Signing(jsonwebtoken::errors::Error),
}

/// An issued access/refresh pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Signs and verifies tokens with the configured secret.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenService {
    #[must_use]
    pub fn new(secret: &SecretString) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Issue an access and a refresh token for `user`.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Signing` if encoding fails.
    pub fn issue_pair(&self, user: &User) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access: self.issue(user, TokenKind::Access)?,
            refresh: self.issue(user, TokenKind::Refresh)?,
        })
    }

    /// # Errors
    ///
    /// Returns `TokenError::Signing` if encoding fails.
    pub fn issue(&self, user: &User, kind: TokenKind) -> Result<String, TokenError> {
        let now = Utc::now();
        let ttl = match kind {
            TokenKind::Access => ACCESS_TOKEN_TTL,
            TokenKind::Refresh => REFRESH_TOKEN_TTL,
        };
        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.to_string(),
            nombre: user.nombre.clone(),
            apellidos: user.apellidos.clone(),
            token_type: kind,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(TokenError::Signing)
    }

    /// Verify signature, expiry and kind.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Invalid` for a bad or expired token and
    /// `TokenError::WrongKind` when a token of the other kind is presented.
    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<Claims, TokenError> {
        let claims = decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|_| TokenError::Invalid)?
            .claims;
        if claims.token_type != kind {
            return Err(TokenError::WrongKind);
        }
        Ok(claims)
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// The user is re-read by the caller; only the claims are reused here.
    ///
    /// # Errors
    ///
    /// Returns `TokenError` if the refresh token does not verify.
    pub fn refresh(&self, refresh_token: &str) -> Result<Claims, TokenError> {
        self.verify(refresh_token, TokenKind::Refresh)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use davila_core::Email;

    use super::*;

    fn user() -> User {
        let now = Utc::now();
        User {
            id: UserId::new(7),
            email: Email::parse("ana@example.com").unwrap(),
            password_hash: String::new(),
            nombre: Some("Ana".to_string()),
            apellidos: Some("Quispe".to_string()),
            direccion: None,
            is_active: true,
            is_staff: false,
            is_verified: true,
            puede_ver_precios: true,
            puede_ver_precios_mayoreo: false,
            failed_login_attempts: 0,
            blocked_until: None,
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn service() -> TokenService {
        TokenService::new(&SecretString::from("k3J9#mQ2$vL8@nP5&xR7!wT4^zY6*bH1"))
    }

    #[test]
    fn test_access_token_round_trip_carries_identity() {
        let tokens = service();
        let pair = tokens.issue_pair(&user()).unwrap();

        let claims = tokens.verify(&pair.access, TokenKind::Access).unwrap();
        assert_eq!(claims.user_id().unwrap(), UserId::new(7));
        assert_eq!(claims.email, "ana@example.com");
        assert_eq!(claims.nombre.as_deref(), Some("Ana"));
        assert_eq!(claims.exp - claims.iat, ACCESS_TOKEN_TTL.num_seconds());
    }

    #[test]
    fn test_refresh_token_is_not_an_access_token() {
        let tokens = service();
        let pair = tokens.issue_pair(&user()).unwrap();

        assert!(matches!(
            tokens.verify(&pair.refresh, TokenKind::Access),
            Err(TokenError::WrongKind)
        ));
        assert!(tokens.refresh(&pair.refresh).is_ok());
        assert!(tokens.refresh(&pair.access).is_err());
    }

    #[test]
    fn test_token_signed_with_other_secret_is_rejected() {
        let other = TokenService::new(&SecretString::from("another-secret-that-is-long-enough-1234"));
        let token = other.issue(&user(), TokenKind::Access).unwrap();

        assert!(matches!(
            service().verify(&token, TokenKind::Access),
            Err(TokenError::Invalid)
        ));
    }

    #[test]
    fn test_garbage_token_is_rejected() {
        assert!(service().verify("not.a.jwt", TokenKind::Access).is_err());
    }
}
