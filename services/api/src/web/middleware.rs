//! services/api/src/web/middleware.rs
//!
//! Session middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

use crate::web::state::AppState;

/// Middleware that requires an established session.
///
/// If one exists, inserts the `Session` into request extensions for handlers to use.
/// Otherwise returns 401 Unauthorized.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(session) = state.sessions.current().await else {
        debug!("Rejected {} {}: no active session", req.method(), req.uri().path());
        return Err(StatusCode::UNAUTHORIZED);
    };

    req.extensions_mut().insert(session);
    Ok(next.run(req).await)
}
