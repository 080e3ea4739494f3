//! Data models for station operators.
//!
//! - `LoginUser`, `UserProfile`: operator accounts and their permissions
//! - `LoginRecord`: one successful login at a station
//! - `Station`: the terminal a session authenticates against

pub mod station;
pub mod user;

pub use station::Station;
pub use user::{LoginRecord, LoginUser, UserProfile, ADMIN_USERNAME};
