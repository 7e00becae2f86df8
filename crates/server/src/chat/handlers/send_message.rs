//! POST /auth/send_message
//!
//! Answers `text/event-stream`:
//!
//! ```text
//! data: <fragment>
//!
//! data: <fragment>
//!
//! event: done
//! data: [stream closed]
//! ```
//!
//! A session cut short after the first fragment ends with a single
//! `event: error` frame instead of `done`.

use super::chat::authorize_chat;
use crate::chat::relay::RelayEvent;
use crate::config::AppState;
use crate::core::ctx::Ctx;
use crate::core::error::Result;
use crate::core::response::JsonBody;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::convert::Infallible;
use tracing::info;

pub const DONE_EVENT: &str = "done";
pub const DONE_DATA: &str = "[stream closed]";
pub const ERROR_EVENT: &str = "error";

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub chat_id: i64,
    #[serde(default)]
    pub text: String,
}

pub async fn send_message(
    State(state): State<AppState>,
    ctx: Ctx,
    JsonBody(req): JsonBody<SendMessageRequest>,
) -> Result<Response> {
    info!(user_id = ctx.user_id(), chat_id = req.chat_id, "POST /auth/send_message");

    authorize_chat(&state, &ctx, req.chat_id).await?;

    let mut session = state.relay.start(req.chat_id, &req.text).await?;

    let stream = async_stream::stream! {
        while let Some(event) = session.events.recv().await {
            yield Ok::<Event, Infallible>(to_sse(event));
        }
    };

    Ok(Sse::new(stream)
        .keep_alive(KeepAlive::default())
        .into_response())
}

fn to_sse(event: RelayEvent) -> Event {
    match event {
        RelayEvent::Fragment(text) => Event::default().data(sse_safe(&text)),
        RelayEvent::Done => Event::default().event(DONE_EVENT).data(DONE_DATA),
        RelayEvent::Error(message) => Event::default().event(ERROR_EVENT).data(sse_safe(&message)),
    }
}

/// SSE fields cannot carry `\r`; line breaks become `\n`, which the
/// encoder splits into consecutive `data:` lines.
fn sse_safe(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}
