//! Core Service Layer
//!
//! Shared infrastructure: authentication, request identity, errors,
//! response envelopes, the database handle and the routing table.

pub mod auth;
pub mod ctx;
pub mod db;
pub mod error;
pub mod response;
pub mod router;

// Re-exports for convenience
pub use ctx::Ctx;
pub use error::{Error, Result};
pub use router::router;
