//! CLI subcommands.

pub mod admin;
pub mod migrate;

use secrecy::SecretString;

/// Read the database URL the same way the API does.
pub(crate) fn database_url() -> Option<SecretString> {
    dotenvy::dotenv().ok();
    std::env::var("DAVILA_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .map(SecretString::from)
}
