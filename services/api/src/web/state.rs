//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::adapters::{open_repositories, SessionStore, UploadStore};
use crate::config::Config;
use crate::error::ApiError;
use blog_core::{PortResult, PostRepository, UserRepository};
use chrono::Duration;
use std::sync::Arc;
use tokio::sync::Mutex;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
pub struct AppState {
    pub config: Arc<Config>,
    pub users: UserRepository,
    pub posts: PostRepository,
    pub sessions: SessionStore,
    pub uploads: UploadStore,
    /// Serializes every read-modify-write against the JSON collections.
    /// The repositories themselves do no locking.
    pub write_lock: Mutex<()>,
}

impl AppState {
    /// Opens the collections and upload directory named in `config`.
    pub async fn from_config(config: Arc<Config>) -> Result<Self, ApiError> {
        let data_dir = config.data_dir.clone();
        let (users, posts) = run_blocking(move || open_repositories(&data_dir)).await?;

        let uploads = UploadStore::new(config.upload_dir.clone());
        uploads.ensure_dir().await?;

        Ok(Self {
            sessions: SessionStore::new(Duration::hours(config.session_ttl_hours)),
            config,
            users,
            posts,
            uploads,
            write_lock: Mutex::new(()),
        })
    }
}

/// Runs a synchronous repository call on the blocking thread pool.
pub async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> PortResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(format!("Blocking task failed: {}", e)))?
        .map_err(ApiError::from)
}
