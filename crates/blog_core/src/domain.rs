//! crates/blog_core/src/domain.rs
//!
//! Defines the core data structures for the blog: users, posts and the
//! comments embedded in them. The serde layout of these structs is the on-disk
//! layout of the JSON collections.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ports::{PortError, PortResult, Record};

/// Generates a fresh random identifier for posts and comments.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn require_non_empty(field: &str, value: &str) -> PortResult<()> {
    if value.trim().is_empty() {
        return Err(PortError::InvalidInput(format!("{} must not be empty", field)));
    }
    Ok(())
}

//=========================================================================================
// User
//=========================================================================================

/// A registered account. `password` always holds a salted hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub password: String,
}

impl User {
    /// Builds a user from a username and an already-hashed password.
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>) -> PortResult<Self> {
        let username = username.into();
        let password = password_hash.into();
        require_non_empty("username", &username)?;
        require_non_empty("password", &password)?;
        Ok(Self { username, password })
    }
}

impl Record for User {
    fn key(&self) -> &str {
        &self.username
    }
}

//=========================================================================================
// Comment
//=========================================================================================

/// A single comment, owned by the post it is embedded in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub author: String,
    pub text: String,
}

impl Comment {
    pub fn new(author: impl Into<String>, text: impl Into<String>) -> PortResult<Self> {
        let author = author.into();
        let text = text.into();
        require_non_empty("author", &author)?;
        require_non_empty("text", &text)?;
        Ok(Self {
            id: new_id(),
            author,
            text,
        })
    }
}

//=========================================================================================
// Post
//=========================================================================================

/// A blog post with its comments and attached media.
///
/// `id` and `author` never change after creation. Files written before media
/// attachments existed may omit `comments` or `media_urls`; both default to empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub content: String,
    pub author: String,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub media_urls: Vec<String>,
}

impl Post {
    /// Creates a post with a fresh id and no comments.
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        author: impl Into<String>,
        media_urls: Vec<String>,
    ) -> PortResult<Self> {
        let title = title.into();
        let content = content.into();
        let author = author.into();
        require_non_empty("title", &title)?;
        require_non_empty("content", &content)?;
        require_non_empty("author", &author)?;
        Ok(Self {
            id: new_id(),
            title,
            content,
            author,
            comments: Vec::new(),
            media_urls,
        })
    }

    /// Overwrites the editable fields. `media_urls` is replaced, not merged.
    pub fn revise(
        &mut self,
        title: impl Into<String>,
        content: impl Into<String>,
        media_urls: Vec<String>,
    ) -> PortResult<()> {
        let title = title.into();
        let content = content.into();
        require_non_empty("title", &title)?;
        require_non_empty("content", &content)?;
        self.title = title;
        self.content = content;
        self.media_urls = media_urls;
        Ok(())
    }
}

impl Record for Post {
    fn key(&self) -> &str {
        &self.id
    }
}
