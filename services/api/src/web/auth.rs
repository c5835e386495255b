//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for registration, login, and logout.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use blog_core::UserRepository;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;

use crate::web::middleware::{current_username, session_id_from_headers, CurrentUser};
use crate::web::state::{run_blocking, AppState};

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub username: String,
}

fn session_cookie(session_id: &str, max_age_seconds: i64) -> String {
    format!(
        "session={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        session_id, max_age_seconds
    )
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/register - Create a new user account
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = CredentialsRequest,
    responses(
        (status = 201, description = "User registered", body = AuthResponse),
        (status = 400, description = "Empty username or password, or already logged in"),
        (status = 409, description = "Username already exists"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if current_username(&state, &headers).await.is_some() {
        return Err((StatusCode::BAD_REQUEST, "Already logged in".to_string()));
    }
    if req.username.trim().is_empty() || req.password.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Username and password must not be empty".to_string(),
        ));
    }

    let created = {
        let _guard = state.write_lock.lock().await;
        let users = state.users.clone();
        let (username, password) = (req.username.clone(), req.password);
        run_blocking(move || users.add_user(&username, &password))
            .await
            .map_err(|e| e.into_response_parts("Failed to register user"))?
    };

    if !created {
        return Err((StatusCode::CONFLICT, "Username already exists".to_string()));
    }

    info!("Registered user {}", req.username);
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            username: req.username,
        }),
    ))
}

/// POST /auth/login - Login with an existing account
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = CredentialsRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Already logged in"),
        (status = 401, description = "Invalid username or password"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if current_username(&state, &headers).await.is_some() {
        return Err((StatusCode::BAD_REQUEST, "Already logged in".to_string()));
    }

    // Argon2 verification is CPU-bound; keep it off the async workers.
    let users = state.users.clone();
    let (username, password) = (req.username.clone(), req.password);
    let valid = run_blocking(move || {
        Ok(users
            .find_user(&username)?
            .map(|user| UserRepository::verify_password(&user.password, &password))
            .unwrap_or(false))
    })
    .await
    .map_err(|e| e.into_response_parts("Authentication error"))?;

    if !valid {
        return Err((
            StatusCode::UNAUTHORIZED,
            "Invalid username or password".to_string(),
        ));
    }

    let session_id = state.sessions.create(&req.username).await;
    let cookie = session_cookie(&session_id, state.sessions.ttl().num_seconds());
    info!("User {} logged in", req.username);

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse {
            username: req.username,
        }),
    ))
}

/// POST /auth/logout - Logout and invalidate the session
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logged out")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if let Some(session_id) = session_id_from_headers(&headers) {
        state.sessions.delete(session_id).await;
    }
    (StatusCode::OK, [(header::SET_COOKIE, session_cookie("", 0))])
}

/// GET /auth/me - The currently logged-in user
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Current user", body = AuthResponse),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn me_handler(Extension(CurrentUser(username)): Extension<CurrentUser>) -> Json<AuthResponse> {
    Json(AuthResponse { username })
}
