//! Davila Core - domain types and rules for the Davila motorcycle-parts store.
//!
//! Used by:
//! - `api` - the HTTP backend
//! - `cli` - migrations and account management
//!
//! # Architecture
//!
//! The core crate holds types and pure business rules only: no I/O, no
//! database access, no HTTP. Database encoding for IDs, emails and status
//! enums is available behind the `postgres` feature.
//!
//! # Modules
//!
//! - [`types::id`] - type-safe entity IDs
//! - [`types::email`] - normalized email addresses
//! - [`types::status`] - order lifecycle and stock movements
//! - [`types::price`] - price visibility and line pricing
//! - [`types::verification`] - verification codes, resend limits, login lockout
//! - [`types::slug`] - slug generation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
