//! Authentication
//!
//! Handles:
//! - Signed session tokens
//! - Password hashing
//! - Request extractors for the signed-in account
//! - Country-based access gate

mod geo;
mod middleware;
pub mod password;
pub mod session;

pub use geo::{blocked_country, geo_gate};
pub use middleware::{CurrentUser, MaybeUser, SESSION_COOKIE};
pub use session::{Session, create_session_token, verify_session_token};
