//! Data layer module
//!
//! Handles all data persistence:
//! - `SocialStore` trait (the seam services depend on)
//! - SQLite implementation (`Database`)

mod database;
mod models;
mod store;

pub use database::Database;
pub use models::*;
#[cfg(test)]
pub use store::MockSocialStore;
pub use store::SocialStore;
