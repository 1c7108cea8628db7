//! Business logic services.
//!
//! # Services
//!
//! - `auth` - registration with email codes, login lockout, password reset
//! - `checkout` - order placement and status changes with stock movement
//! - `email` - verification and reset emails (SMTP or log)
//! - `media` - product image files
//! - `password_reset` - stateless reset tokens
//! - `tokens` - JWT access and refresh tokens

pub mod auth;
pub mod checkout;
pub mod email;
pub mod media;
pub mod password_reset;
pub mod tokens;
