//! Operator API on its own listener, behind a bearer key.

pub mod auth;
pub mod handlers;

use axum::{middleware, routing::get, Router};

use self::auth::admin_auth_middleware;
use self::handlers::{get_limiter, get_logs, get_stats, get_status};
use crate::http::endpoints::not_found;
use crate::http::error::render_errors;
use crate::http::server::AppState;

pub fn setup_admin_router(state: AppState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/limiter", get(get_limiter))
        .route("/admin/stats", get(get_stats))
        .route("/admin/logs", get(get_logs))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware,
        ))
        .fallback(not_found)
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(state, render_errors))
}
