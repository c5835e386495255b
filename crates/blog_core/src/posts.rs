//! crates/blog_core/src/posts.rs
//!
//! Post, comment and media operations over the post collection.
//! No authorization happens here; callers compare `Post::author` themselves.

use std::sync::Arc;

use tracing::debug;

use crate::domain::{Comment, Post};
use crate::ports::{CollectionStore, PortResult, Repository};
use crate::repository::CollectionRepository;

#[derive(Clone)]
pub struct PostRepository {
    posts: Arc<dyn Repository<Post>>,
}

impl PostRepository {
    /// Creates a `PostRepository` over a whole-collection store.
    pub fn new(store: Arc<dyn CollectionStore<Post>>) -> Self {
        Self::with_repository(Arc::new(CollectionRepository::new(store)))
    }

    pub fn with_repository(posts: Arc<dyn Repository<Post>>) -> Self {
        Self { posts }
    }

    /// All posts in insertion order.
    pub fn load_posts(&self) -> PortResult<Vec<Post>> {
        self.posts.list()
    }

    pub fn get_post_by_id(&self, id: &str) -> PortResult<Option<Post>> {
        self.posts.find_by_id(id)
    }

    /// Creates a post with no comments and returns its new id.
    pub fn add_post(
        &self,
        title: &str,
        content: &str,
        author: &str,
        media_urls: Vec<String>,
    ) -> PortResult<String> {
        let post = Post::new(title, content, author, media_urls)?;
        let id = post.id.clone();
        self.posts.insert(post)?;
        debug!(post_id = %id, author, "Added post");
        Ok(id)
    }

    /// Replaces title, content and media of post `id`.
    ///
    /// `media_urls` overwrites the stored list; callers that want to keep
    /// existing attachments pass the combined list.
    pub fn update_post(
        &self,
        id: &str,
        title: &str,
        content: &str,
        media_urls: Vec<String>,
    ) -> PortResult<bool> {
        let mut media_urls = Some(media_urls);
        let updated = self.posts.update(id, &mut |post: &mut Post| {
            post.revise(title, content, media_urls.take().unwrap_or_default())
        })?;
        if updated {
            debug!(post_id = id, "Updated post");
        }
        Ok(updated)
    }

    /// Removes post `id` along with its comments. Returns `false` if it did not exist.
    pub fn delete_post(&self, id: &str) -> PortResult<bool> {
        let deleted = self.posts.delete(id)?;
        if deleted {
            debug!(post_id = id, "Deleted post");
        }
        Ok(deleted)
    }

    /// Appends a comment to the end of post `post_id`'s comments.
    pub fn add_comment(&self, post_id: &str, author: &str, text: &str) -> PortResult<bool> {
        let comment = Comment::new(author, text)?;
        let mut comment = Some(comment);
        let added = self.posts.update(post_id, &mut |post: &mut Post| {
            post.comments.extend(comment.take());
            Ok(())
        })?;
        if added {
            debug!(post_id, author, "Added comment");
        }
        Ok(added)
    }
}
