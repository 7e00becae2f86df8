use crate::config::AppState;
use crate::core::ctx::Ctx;
use crate::core::error::Result;
use crate::core::response::JsonBody;
use crate::records::profile::{Profile, ProfileUpdate};
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use tracing::info;

/// GET /auth/me
pub async fn me(State(state): State<AppState>, ctx: Ctx) -> Result<Json<Profile>> {
    info!(user_id = ctx.user_id(), "GET /auth/me");

    let profile = state.profiles.get(ctx.user_id()).await?;

    Ok(Json(profile))
}

/// POST /auth/me
///
/// Absent fields are left untouched.
pub async fn update_me(
    State(state): State<AppState>,
    ctx: Ctx,
    JsonBody(update): JsonBody<ProfileUpdate>,
) -> Result<StatusCode> {
    info!(user_id = ctx.user_id(), "POST /auth/me");

    state.profiles.update(ctx.user_id(), update).await?;

    Ok(StatusCode::OK)
}
