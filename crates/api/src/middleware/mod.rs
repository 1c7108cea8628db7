//! HTTP middleware stack for the API.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. CORS (configured frontend origins, with credentials)
//! 5. Security headers
//! 6. Rate limiting (governor), per route group
//!
//! Authentication is not a layer: handlers opt in through the extractors in
//! [`auth`].

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;

pub use auth::{OptionalAuth, RequireAdmin, RequireAuth, login_cookies, logout_cookies};
pub use rate_limit::{api_rate_limiter, auth_rate_limiter, json_rate_limit_response};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
