//! Stateless password reset tokens.
//!
//! A token is `{timestamp_b36}-{mac}` where `mac` is the first 16 bytes
//! (hex) of an HMAC-SHA256 over the user id, password hash, last login and
//! timestamp. Changing the password or logging in changes the MAC input, so
//! outstanding tokens stop verifying without any server-side state.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, TimeDelta, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use davila_core::UserId;

use crate::models::user::User;

type HmacSha256 = Hmac<Sha256>;

/// Days a reset link stays valid.
pub const RESET_TOKEN_DAYS: i64 = 3;
const MAC_BYTES: usize = 16;

/// Issues and checks reset tokens keyed by the server secret.
#[derive(Clone)]
pub struct ResetTokens {
    secret: SecretString,
}

impl ResetTokens {
    #[must_use]
    pub const fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    /// Token for `user` stamped at `now`.
    #[must_use]
    pub fn make(&self, user: &User, now: DateTime<Utc>) -> String {
        let ts = u64::try_from(now.timestamp()).unwrap_or_default();
        let tag = self.mac(user, ts).map(|mac| mac.finalize().into_bytes());
        let hex_tag = tag
            .map(|bytes| hex::encode(bytes.get(..MAC_BYTES).unwrap_or_default()))
            .unwrap_or_default();
        format!("{}-{hex_tag}", to_base36(ts))
    }

    /// Whether `token` was issued for `user` in its current state and has not
    /// expired at `now`.
    #[must_use]
    pub fn check(&self, user: &User, token: &str, now: DateTime<Utc>) -> bool {
        let Some((ts_part, tag_part)) = token.split_once('-') else {
            return false;
        };
        let Some(ts) = from_base36(ts_part) else {
            return false;
        };
        let Ok(tag) = hex::decode(tag_part) else {
            return false;
        };
        if tag.len() != MAC_BYTES {
            return false;
        }

        let Some(issued_at) = i64::try_from(ts)
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
        else {
            return false;
        };
        if now - issued_at > TimeDelta::days(RESET_TOKEN_DAYS) || issued_at > now {
            return false;
        }

        self.mac(user, ts)
            .is_some_and(|mac| mac.verify_truncated_left(&tag).is_ok())
    }

    fn mac(&self, user: &User, ts: u64) -> Option<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes()).ok()?;
        let last_login = user
            .last_login
            .map(|at| at.timestamp().to_string())
            .unwrap_or_default();
        mac.update(format!("{}|{}|{last_login}|{ts}", user.id, user.password_hash).as_bytes());
        Some(mac)
    }
}

/// URL-safe encoding of a user id for reset links.
#[must_use]
pub fn encode_uid(id: UserId) -> String {
    URL_SAFE_NO_PAD.encode(id.to_string())
}

/// Inverse of [`encode_uid`].
#[must_use]
pub fn decode_uid(uid: &str) -> Option<UserId> {
    let bytes = URL_SAFE_NO_PAD.decode(uid.trim_end_matches('=')).ok()?;
    let text = String::from_utf8(bytes).ok()?;
    text.parse::<i32>().ok().map(UserId::new)
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        let idx = usize::try_from(n % 36).unwrap_or_default();
        out.push(DIGITS.get(idx).copied().unwrap_or(b'0'));
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

fn from_base36(s: &str) -> Option<u64> {
    if s.is_empty() || s.len() > 13 {
        return None;
    }
    u64::from_str_radix(s, 36).ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use davila_core::Email;

    use super::*;

    fn user(password_hash: &str) -> User {
        let now = Utc::now();
        User {
            id: UserId::new(42),
            email: Email::parse("luis@example.com").unwrap(),
            password_hash: password_hash.to_string(),
            nombre: None,
            apellidos: None,
            direccion: None,
            is_active: true,
            is_staff: false,
            is_verified: true,
            puede_ver_precios: false,
            puede_ver_precios_mayoreo: false,
            failed_login_attempts: 0,
            blocked_until: None,
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn tokens() -> ResetTokens {
        ResetTokens::new(SecretString::from("reset-secret-with-enough-entropy-42!"))
    }

    #[test]
    fn test_fresh_token_verifies() {
        let now = Utc::now();
        let u = user("$argon2id$v=19$abc");
        let token = tokens().make(&u, now);
        assert!(tokens().check(&u, &token, now));
    }

    #[test]
    fn test_token_expires_after_three_days() {
        let issued = Utc::now();
        let u = user("$argon2id$v=19$abc");
        let token = tokens().make(&u, issued);

        assert!(tokens().check(&u, &token, issued + TimeDelta::days(2)));
        assert!(!tokens().check(&u, &token, issued + TimeDelta::days(3) + TimeDelta::seconds(1)));
    }

    #[test]
    fn test_password_change_invalidates_token() {
        let now = Utc::now();
        let token = tokens().make(&user("$argon2id$old"), now);
        assert!(!tokens().check(&user("$argon2id$new"), &token, now));
    }

    #[test]
    fn test_login_invalidates_token() {
        let now = Utc::now();
        let before = user("$argon2id$abc");
        let token = tokens().make(&before, now);

        let mut after = before;
        after.last_login = Some(now);
        assert!(!tokens().check(&after, &token, now));
    }

    #[test]
    fn test_malformed_tokens_are_rejected() {
        let now = Utc::now();
        let u = user("$argon2id$abc");
        for token in ["", "abc", "zz-nothex", "1-00", "-", "1-"] {
            assert!(!tokens().check(&u, token, now), "accepted {token:?}");
        }
    }

    #[test]
    fn test_uid_round_trip() {
        let uid = encode_uid(UserId::new(1234));
        assert!(!uid.contains('='));
        assert_eq!(decode_uid(&uid), Some(UserId::new(1234)));
        assert_eq!(decode_uid("!!"), None);
    }

    #[test]
    fn test_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(from_base36("10"), Some(36));
        assert_eq!(from_base36(""), None);
    }
}
