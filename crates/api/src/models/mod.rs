//! Domain models and their JSON representations.
//!
//! Row types derive `sqlx::FromRow` and are loaded by the repositories in
//! [`crate::db`]. Response types are what handlers serialize; they apply
//! per-viewer rules such as price visibility.

pub mod analytics;
pub mod cart;
pub mod catalog;
pub mod order;
pub mod product;
pub mod supplier;
pub mod user;
pub mod wishlist;
