//! Core Router
//!
//! `/`, `/signup` and `/login` are public. Everything under `/auth/` goes
//! through [`mw_require_auth`].

use crate::chat;
use crate::config::AppState;
use crate::core::auth::handlers as auth_handlers;
use crate::core::auth::middleware::mw_require_auth;
use crate::records;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/auth/me", get(auth_handlers::me).post(auth_handlers::update_me))
        .merge(chat::router())
        .merge(records::router())
        .route_layer(middleware::from_fn_with_state(state.clone(), mw_require_auth));

    Router::new()
        .route("/", get(home))
        .route("/signup", post(auth_handlers::signup))
        .route("/login", post(auth_handlers::login))
        .merge(protected)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn home() -> &'static str {
    "OK - First Aid Companion API"
}
