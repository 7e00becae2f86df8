use crate::chat::models::{ChatSummary, MessageView};
use crate::config::AppState;
use crate::core::ctx::Ctx;
use crate::core::error::{Error, Result};
use crate::core::response::ApiResponse;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Default, Deserialize)]
pub struct NewChatParams {
    pub title: Option<String>,
}

/// GET|POST /auth/new_chat
pub async fn new_chat(
    State(state): State<AppState>,
    ctx: Ctx,
    Query(params): Query<NewChatParams>,
) -> Result<ApiResponse<i64>> {
    info!(user_id = ctx.user_id(), "/auth/new_chat");

    let chat = state
        .chats
        .create_chat(ctx.user_id(), params.title.as_deref())
        .await?;

    Ok(ApiResponse::ok(chat.id))
}

/// GET /auth/chats
pub async fn list_chats(
    State(state): State<AppState>,
    ctx: Ctx,
) -> Result<ApiResponse<Vec<ChatSummary>>> {
    info!(user_id = ctx.user_id(), "GET /auth/chats");

    let chats = state.chats.list_chats(ctx.user_id()).await?;

    Ok(ApiResponse::ok(chats))
}

/// GET /auth/chats/{chat_id}
///
/// Messages oldest first.
pub async fn get_chat(
    State(state): State<AppState>,
    ctx: Ctx,
    Path(chat_id): Path<i64>,
) -> Result<ApiResponse<Vec<MessageView>>> {
    info!(user_id = ctx.user_id(), chat_id, "GET /auth/chats/{{id}}");

    authorize_chat(&state, &ctx, chat_id).await?;

    let chat = state.chats.get_chat_with_messages(chat_id).await?;

    Ok(ApiResponse::ok(
        chat.messages.into_iter().map(MessageView::from).collect(),
    ))
}

/// With ownership enforcement on, someone else's chat looks exactly like a
/// missing one.
pub(crate) async fn authorize_chat(state: &AppState, ctx: &Ctx, chat_id: i64) -> Result<()> {
    if !state.config.enforce_chat_ownership {
        return Ok(());
    }

    let owner = state.chats.chat_owner(chat_id).await?;
    if owner != ctx.user_id() {
        return Err(Error::NotFound("chat not found".to_string()));
    }

    Ok(())
}
