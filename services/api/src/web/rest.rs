//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the post and comment endpoints and the master
//! definition for the OpenAPI specification.

use crate::adapters::UploadError;
use crate::error::ApiError;
use crate::web::auth::{AuthResponse, CredentialsRequest};
use crate::web::middleware::CurrentUser;
use crate::web::state::{run_blocking, AppState};
use axum::{
    body::Bytes,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use blog_core::{Comment, Post};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::{OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        list_posts_handler,
        get_post_handler,
        create_post_handler,
        update_post_handler,
        delete_post_handler,
        add_comment_handler,
        crate::web::auth::register_handler,
        crate::web::auth::login_handler,
        crate::web::auth::logout_handler,
        crate::web::auth::me_handler,
    ),
    components(
        schemas(PostView, CommentView, PostSavedResponse, NewCommentRequest, CredentialsRequest, AuthResponse)
    ),
    tags(
        (name = "Blog API", description = "Posts, comments, media uploads and accounts.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct CommentView {
    pub id: String,
    pub author: String,
    pub text: String,
}

impl From<Comment> for CommentView {
    fn from(c: Comment) -> Self {
        Self {
            id: c.id,
            author: c.author,
            text: c.text,
        }
    }
}

/// A post as returned to clients.
#[derive(Serialize, ToSchema)]
pub struct PostView {
    pub id: String,
    pub title: String,
    pub content: String,
    pub author: String,
    pub comments: Vec<CommentView>,
    pub media_urls: Vec<String>,
}

impl From<Post> for PostView {
    fn from(p: Post) -> Self {
        Self {
            id: p.id,
            title: p.title,
            content: p.content,
            author: p.author,
            comments: p.comments.into_iter().map(CommentView::from).collect(),
            media_urls: p.media_urls,
        }
    }
}

/// Sent after a post is created or edited.
#[derive(Serialize, ToSchema)]
pub struct PostSavedResponse {
    pub id: String,
    pub media_urls: Vec<String>,
    /// Uploaded files that were skipped (bad extension or name).
    pub rejected_files: Vec<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct NewCommentRequest {
    pub text: String,
}

//=========================================================================================
// Multipart Post Form
//=========================================================================================

/// The fields of a create/edit post form, read fully into memory.
struct PostForm {
    title: String,
    content: String,
    files: Vec<(String, Bytes)>,
}

/// Uploads from one form after they have been written to disk.
struct StoredMedia {
    media_urls: Vec<String>,
    rejected_files: Vec<String>,
}

/// Reads `title`, `content` and any number of `media_files` parts.
///
/// Nothing touches the disk here, so callers can drain the request body
/// before taking the write lock.
async fn read_post_form(mut multipart: Multipart) -> Result<PostForm, (StatusCode, String)> {
    let mut title = String::new();
    let mut content = String::new();
    let mut files: Vec<(String, Bytes)> = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            format!("Failed to read multipart data: {}", e),
        )
    })? {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let read_err = |e: axum::extract::multipart::MultipartError| {
            (
                StatusCode::BAD_REQUEST,
                format!("Failed to read field '{}': {}", name, e),
            )
        };
        match name.as_str() {
            "title" => title = field.text().await.map_err(read_err)?,
            "content" => content = field.text().await.map_err(read_err)?,
            "media_files" => {
                let data = field.bytes().await.map_err(read_err)?;
                // Browsers send an empty, unnamed part when no file was chosen.
                match file_name {
                    Some(file_name) if !file_name.is_empty() => files.push((file_name, data)),
                    _ => {}
                }
            }
            _ => {}
        }
    }

    if title.trim().is_empty() || content.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Title and content must not be empty".to_string(),
        ));
    }

    Ok(PostForm {
        title,
        content,
        files,
    })
}

/// Writes the accepted files of a form and collects the rejected names.
///
/// If a write fails, files already written for this form are removed again.
async fn store_uploads(
    state: &AppState,
    files: Vec<(String, Bytes)>,
) -> Result<StoredMedia, (StatusCode, String)> {
    let mut media_urls = Vec::new();
    let mut rejected_files = Vec::new();
    for (file_name, data) in files {
        match state.uploads.save(&file_name, &data).await {
            Ok(url) => media_urls.push(url),
            Err(UploadError::NotAllowed(_)) => {
                warn!("Rejected upload {}", file_name);
                rejected_files.push(file_name);
            }
            Err(e) => {
                discard_uploads(state, &media_urls).await;
                return Err(ApiError::from(e).into_response_parts("Failed to store upload"));
            }
        }
    }
    Ok(StoredMedia {
        media_urls,
        rejected_files,
    })
}

/// Removes uploads that no post ended up referencing.
async fn discard_uploads(state: &AppState, urls: &[String]) {
    for url in urls {
        if let Err(e) = state.uploads.remove(url).await {
            warn!("Could not remove orphaned upload {}: {}", url, e);
        }
    }
}

/// Loads post `id` and checks that `username` wrote it.
async fn load_owned_post(
    state: &AppState,
    id: &str,
    username: &str,
) -> Result<Post, (StatusCode, String)> {
    let posts = state.posts.clone();
    let lookup_id = id.to_string();
    let post = run_blocking(move || posts.get_post_by_id(&lookup_id))
        .await
        .map_err(|e| e.into_response_parts("Failed to load post"))?
        .ok_or((StatusCode::NOT_FOUND, "Post does not exist".to_string()))?;

    if post.author != username {
        return Err((
            StatusCode::FORBIDDEN,
            "You are not the author of this post".to_string(),
        ));
    }
    Ok(post)
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// List every post, oldest first.
#[utoipa::path(
    get,
    path = "/posts",
    responses(
        (status = 200, description = "All posts", body = [PostView]),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_posts_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<PostView>>, (StatusCode, String)> {
    let posts = state.posts.clone();
    let all = run_blocking(move || posts.load_posts())
        .await
        .map_err(|e| e.into_response_parts("Failed to load posts"))?;
    Ok(Json(all.into_iter().map(PostView::from).collect()))
}

/// Fetch a single post with its comments.
#[utoipa::path(
    get,
    path = "/posts/{id}",
    params(("id" = String, Path, description = "Post id")),
    responses(
        (status = 200, description = "The post", body = PostView),
        (status = 404, description = "Post does not exist")
    )
)]
pub async fn get_post_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<PostView>, (StatusCode, String)> {
    let posts = state.posts.clone();
    let post = run_blocking(move || posts.get_post_by_id(&id))
        .await
        .map_err(|e| e.into_response_parts("Failed to load post"))?
        .ok_or((StatusCode::NOT_FOUND, "Post does not exist".to_string()))?;
    Ok(Json(PostView::from(post)))
}

/// Create a post.
///
/// Accepts multipart/form-data with `title`, `content` and zero or more
/// `media_files` parts.
#[utoipa::path(
    post,
    path = "/posts",
    request_body(content_type = "multipart/form-data", description = "Title, content and media files."),
    responses(
        (status = 201, description = "Post created", body = PostSavedResponse),
        (status = 400, description = "Empty title or content"),
        (status = 401, description = "Not logged in"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn create_post_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(username)): Extension<CurrentUser>,
    multipart: Multipart,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let form = read_post_form(multipart).await?;

    let (id, stored) = {
        let _guard = state.write_lock.lock().await;
        let stored = store_uploads(&state, form.files).await?;
        let posts = state.posts.clone();
        let (title, content, media) = (form.title, form.content, stored.media_urls.clone());
        let author = username.clone();
        let result = run_blocking(move || posts.add_post(&title, &content, &author, media)).await;
        match result {
            Ok(id) => (id, stored),
            Err(e) => {
                discard_uploads(&state, &stored.media_urls).await;
                return Err(e.into_response_parts("Failed to create post"));
            }
        }
    };

    info!("User {} created post {}", username, id);
    Ok((
        StatusCode::CREATED,
        Json(PostSavedResponse {
            id,
            media_urls: stored.media_urls,
            rejected_files: stored.rejected_files,
        }),
    ))
}

/// Edit a post. New uploads are appended to the existing attachments.
#[utoipa::path(
    put,
    path = "/posts/{id}",
    params(("id" = String, Path, description = "Post id")),
    request_body(content_type = "multipart/form-data", description = "Title, content and additional media files."),
    responses(
        (status = 200, description = "Post updated", body = PostSavedResponse),
        (status = 400, description = "Empty title or content"),
        (status = 401, description = "Not logged in"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Post does not exist")
    )
)]
pub async fn update_post_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(username)): Extension<CurrentUser>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<PostSavedResponse>, (StatusCode, String)> {
    let form = read_post_form(multipart).await?;

    let _guard = state.write_lock.lock().await;
    let existing = load_owned_post(&state, &id, &username).await?;
    let stored = store_uploads(&state, form.files).await?;

    let mut media_urls = existing.media_urls;
    media_urls.extend(stored.media_urls.iter().cloned());

    let posts = state.posts.clone();
    let (post_id, title, content, media) = (id.clone(), form.title, form.content, media_urls.clone());
    let result = run_blocking(move || posts.update_post(&post_id, &title, &content, media)).await;
    let failure = match result {
        Ok(true) => None,
        Ok(false) => Some((StatusCode::NOT_FOUND, "Post does not exist".to_string())),
        Err(e) => Some(e.into_response_parts("Failed to update post")),
    };
    if let Some(failure) = failure {
        discard_uploads(&state, &stored.media_urls).await;
        return Err(failure);
    }

    info!("User {} updated post {}", username, id);
    Ok(Json(PostSavedResponse {
        id,
        media_urls,
        rejected_files: stored.rejected_files,
    }))
}

/// Delete a post and its comments.
#[utoipa::path(
    delete,
    path = "/posts/{id}",
    params(("id" = String, Path, description = "Post id")),
    responses(
        (status = 204, description = "Post deleted"),
        (status = 401, description = "Not logged in"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Post does not exist")
    )
)]
pub async fn delete_post_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(username)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    let _guard = state.write_lock.lock().await;
    load_owned_post(&state, &id, &username).await?;

    let posts = state.posts.clone();
    let post_id = id.clone();
    let deleted = run_blocking(move || posts.delete_post(&post_id))
        .await
        .map_err(|e| e.into_response_parts("Failed to delete post"))?;
    if !deleted {
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            "Could not delete post".to_string(),
        ));
    }

    info!("User {} deleted post {}", username, id);
    Ok(StatusCode::NO_CONTENT)
}

/// Comment on a post.
#[utoipa::path(
    post,
    path = "/posts/{id}/comments",
    params(("id" = String, Path, description = "Post id")),
    request_body = NewCommentRequest,
    responses(
        (status = 201, description = "Comment added, returns the post", body = PostView),
        (status = 400, description = "Empty comment"),
        (status = 401, description = "Not logged in"),
        (status = 404, description = "Post does not exist")
    )
)]
pub async fn add_comment_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(username)): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(req): Json<NewCommentRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if req.text.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Comment must not be empty".to_string(),
        ));
    }

    let post = {
        let _guard = state.write_lock.lock().await;
        let posts = state.posts.clone();
        run_blocking(move || {
            if posts.add_comment(&id, &username, &req.text)? {
                posts.get_post_by_id(&id)
            } else {
                Ok(None)
            }
        })
        .await
        .map_err(|e| e.into_response_parts("Failed to add comment"))?
    };

    match post {
        Some(post) => Ok((StatusCode::CREATED, Json(PostView::from(post)))),
        None => Err((StatusCode::NOT_FOUND, "Post does not exist".to_string())),
    }
}
