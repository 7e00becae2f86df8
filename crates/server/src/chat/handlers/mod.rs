//! Chat Handlers and Router

use crate::config::AppState;
use axum::{
    routing::{get, post},
    Router,
};

pub mod chat;
pub mod send_message;

/// Routes that sit behind the auth gate.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/new_chat", get(chat::new_chat).post(chat::new_chat))
        .route("/auth/chats", get(chat::list_chats))
        .route("/auth/chats/{chat_id}", get(chat::get_chat))
        .route("/auth/send_message", post(send_message::send_message))
}
