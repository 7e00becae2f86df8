//! Chat Service Layer
//!
//! Chat threads, their messages, and the streaming relay that produces
//! assistant replies.

pub mod handlers;
pub mod models;
pub mod relay;
pub mod store;

pub use handlers::router;
pub use relay::{Relay, RelaySettings};
pub use store::ChatStore;
