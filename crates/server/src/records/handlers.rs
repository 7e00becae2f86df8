//! Drug and document handlers. Profile handlers live with auth (`/auth/me`).

use super::documents::{Document, NewDocument};
use super::drugs::{Drug, NewDrug};
use crate::config::AppState;
use crate::core::ctx::Ctx;
use crate::core::error::Result;
use crate::core::response::{ApiResponse, JsonBody};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use tracing::info;

/// Routes that sit behind the auth gate.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/drugs", get(list_drugs))
        .route("/auth/drugs/add", post(add_drug))
        .route("/auth/drugs/remove/{id}", post(remove_drug))
        .route("/auth/documents", get(list_documents))
        .route("/auth/documents/add", post(add_document))
        .route("/auth/documents/remove/{id}", post(remove_document))
}

/// GET /auth/drugs
pub async fn list_drugs(State(state): State<AppState>, ctx: Ctx) -> Result<ApiResponse<Vec<Drug>>> {
    info!(user_id = ctx.user_id(), "GET /auth/drugs");
    Ok(ApiResponse::ok(state.drugs.list(ctx.user_id()).await?))
}

/// POST /auth/drugs/add
pub async fn add_drug(
    State(state): State<AppState>,
    ctx: Ctx,
    JsonBody(drug): JsonBody<NewDrug>,
) -> Result<ApiResponse<i64>> {
    info!(user_id = ctx.user_id(), "POST /auth/drugs/add - {}", drug.name);
    Ok(ApiResponse::ok(state.drugs.add(ctx.user_id(), drug).await?))
}

/// POST /auth/drugs/remove/{id}
pub async fn remove_drug(
    State(state): State<AppState>,
    ctx: Ctx,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    info!(user_id = ctx.user_id(), drug_id = id, "POST /auth/drugs/remove");
    state.drugs.remove(ctx.user_id(), id).await?;
    Ok(StatusCode::OK)
}

/// GET /auth/documents
pub async fn list_documents(
    State(state): State<AppState>,
    ctx: Ctx,
) -> Result<ApiResponse<Vec<Document>>> {
    info!(user_id = ctx.user_id(), "GET /auth/documents");
    Ok(ApiResponse::ok(state.documents.list(ctx.user_id()).await?))
}

/// POST /auth/documents/add
pub async fn add_document(
    State(state): State<AppState>,
    ctx: Ctx,
    JsonBody(doc): JsonBody<NewDocument>,
) -> Result<ApiResponse<i64>> {
    info!(user_id = ctx.user_id(), "POST /auth/documents/add - {}", doc.name);
    Ok(ApiResponse::ok(state.documents.add(ctx.user_id(), doc).await?))
}

/// POST /auth/documents/remove/{id}
pub async fn remove_document(
    State(state): State<AppState>,
    ctx: Ctx,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    info!(user_id = ctx.user_id(), document_id = id, "POST /auth/documents/remove");
    state.documents.remove(ctx.user_id(), id).await?;
    Ok(StatusCode::OK)
}
