pub mod auth;
pub mod middleware;
pub mod rest;
pub mod state;

pub use middleware::require_auth;
pub use state::AppState;

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::services::ServeDir;

use crate::adapters::uploads::UPLOAD_URL_PREFIX;
use auth::{login_handler, logout_handler, me_handler, register_handler};
use rest::{
    add_comment_handler, create_post_handler, delete_post_handler, get_post_handler,
    list_posts_handler, update_post_handler,
};

/// Builds the full HTTP router: public reads, auth endpoints, session-protected
/// writes, and the static file service for uploaded media.
pub fn router(app_state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/posts", get(list_posts_handler))
        .route("/posts/{id}", get(get_post_handler))
        .route("/auth/register", post(register_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", post(logout_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/posts", post(create_post_handler))
        .route(
            "/posts/{id}",
            put(update_post_handler).delete(delete_post_handler),
        )
        .route("/posts/{id}/comments", post(add_comment_handler))
        .route("/auth/me", get(me_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    let uploads = ServeDir::new(app_state.uploads.dir());

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .nest_service(UPLOAD_URL_PREFIX, uploads)
        .layer(DefaultBodyLimit::max(app_state.config.max_upload_bytes))
        .with_state(app_state)
}
