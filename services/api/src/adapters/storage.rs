//! services/api/src/adapters/storage.rs
//!
//! Wires the core repositories to their JSON files inside the data directory.

use blog_core::{
    JsonFileStore, Post, PortResult, PostRepository, User, UserRepository, POSTS_FILE, USERS_FILE,
};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Opens both collections under `data_dir`, creating empty files on first run.
pub fn open_repositories(data_dir: &Path) -> PortResult<(UserRepository, PostRepository)> {
    let users = Arc::new(JsonFileStore::<User>::in_dir(data_dir, USERS_FILE));
    let posts = Arc::new(JsonFileStore::<Post>::in_dir(data_dir, POSTS_FILE));
    users.ensure_exists()?;
    posts.ensure_exists()?;
    info!(
        "Using collections {} and {}",
        users.path().display(),
        posts.path().display()
    );

    Ok((UserRepository::new(users), PostRepository::new(posts)))
}
