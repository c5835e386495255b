//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

use crate::web::state::AppState;

/// The logged-in user's name, inserted into request extensions by [`require_auth`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub String);

/// Reads the opaque session id from the `session` cookie.
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())?
        .split(';')
        .find_map(|c| c.trim().strip_prefix("session="))
        .filter(|id| !id.is_empty())
}

/// Resolves the session cookie to a username, if the session is live.
pub async fn current_username(state: &AppState, headers: &HeaderMap) -> Option<String> {
    let session_id = session_id_from_headers(headers)?;
    state.sessions.validate(session_id).await
}

/// Middleware that validates the session cookie and extracts the username.
///
/// If valid, inserts a [`CurrentUser`] into request extensions for handlers to use.
/// If invalid or missing, returns 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let username = match current_username(&state, req.headers()).await {
        Some(username) => username,
        None => {
            debug!("Rejected request without a live session: {}", req.uri());
            return Err(StatusCode::UNAUTHORIZED);
        }
    };

    req.extensions_mut().insert(CurrentUser(username));
    Ok(next.run(req).await)
}
