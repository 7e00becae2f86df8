use crate::config::AppState;
use crate::core::ctx::Ctx;
use crate::core::error::{Error, Result};
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use tracing::debug;

/// Auth gate for every `/auth/*` route.
///
/// Missing header, wrong scheme, bad token and a user that no longer exists
/// all end in the same [`Error::Unauthenticated`] response.
pub async fn mw_require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response> {
    debug!("MIDDLEWARE: require_auth");

    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(Error::Unauthenticated)?;

    let claims = state.auth.tokens().validate(token).map_err(|e| {
        debug!("token rejected: {}", e);
        Error::Unauthenticated
    })?;

    let user = state.auth.resolve(&claims).await.map_err(|e| {
        debug!(sub = %claims.sub, "token subject did not resolve: {}", e);
        Error::Unauthenticated
    })?;

    req.extensions_mut().insert(Ctx::new(user.id));

    Ok(next.run(req).await)
}
