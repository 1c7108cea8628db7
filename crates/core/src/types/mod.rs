//! Domain types for the Davila store.

pub mod email;
pub mod id;
pub mod price;
pub mod slug;
pub mod status;
pub mod verification;

pub use email::{Email, EmailError};
pub use id::*;
pub use price::{PriceVisibility, Viewer};
pub use status::*;
