//! Auth Handlers

pub mod auth;
pub mod auth_me;

pub use auth::{login, signup};
pub use auth_me::{me, update_me};
