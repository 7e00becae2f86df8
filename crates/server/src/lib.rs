//! First Aid Companion server library
//!
//! Accounts with bearer tokens, a personal medical card, drug inventory and
//! documents, and an AI chat whose replies are streamed as server-sent
//! events while both sides of the conversation are persisted.

pub mod ai;
pub mod chat;
pub mod config;
pub mod core;
pub mod records;
mod server;

pub use crate::core::router::router as app;
pub use server::run;
