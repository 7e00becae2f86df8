//! Auth handlers

use crate::config::AppState;
use crate::core::auth::validate::{check_login, check_signup};
use crate::core::error::{Error, Result};
use crate::core::response::{ApiResponse, JsonBody};
use axum::extract::State;
use serde::Deserialize;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// POST /signup
pub async fn signup(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<SignupRequest>,
) -> Result<ApiResponse<String>> {
    info!("POST /signup - {}", req.email);

    if let Err(reason) = check_signup(&req.name, &req.email, &req.password) {
        warn!("Signup rejected for {}: {}", req.email, reason);
        return Err(Error::Validation(reason.to_string()));
    }

    let (user, token) = state
        .auth
        .signup(req.name.trim(), &req.email, &req.password)
        .await?;

    info!(user_id = user.id, "User {} registered successfully", user.email);
    Ok(ApiResponse::ok(token))
}

/// POST /login
pub async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<ApiResponse<String>> {
    info!("POST /login - {}", req.email);

    if let Err(reason) = check_login(&req.email) {
        warn!("Login rejected for {}: {}", req.email, reason);
        return Err(Error::Validation(reason.to_string()));
    }

    let (_, token) = state.auth.login(&req.email, &req.password).await?;

    Ok(ApiResponse::ok(token))
}
