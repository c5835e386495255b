//! crates/blog_core/src/ports.rs
//!
//! Defines the storage contracts (traits) for the blog's data-access layer.
//! Repositories depend only on these traits, so the JSON-file backend can be
//! swapped for an in-memory fake or a real database without touching callers.

use serde::{de::DeserializeOwned, Serialize};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
///
/// "Not found" is never an error here; lookups return `None` or `false`.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Storage Ports (Traits)
//=========================================================================================

/// An entity that lives in a collection and is addressed by a string key.
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    fn key(&self) -> &str;
}

/// Whole-collection persistence: every save rewrites the full sequence.
pub trait CollectionStore<T>: Send + Sync {
    /// Returns the stored records. Absent or unreadable data yields an empty
    /// collection; only hard I/O failures are errors.
    fn load(&self) -> PortResult<Vec<T>>;

    /// Replaces the stored collection with `records`.
    fn save(&self, records: &[T]) -> PortResult<()>;
}

/// CRUD over one collection of records.
pub trait Repository<T: Record>: Send + Sync {
    fn list(&self) -> PortResult<Vec<T>>;

    fn find_by_id(&self, id: &str) -> PortResult<Option<T>>;

    /// Appends `record` at the end of the collection.
    fn insert(&self, record: T) -> PortResult<()>;

    /// Applies `change` to the record with key `id` and persists. Returns
    /// `false` without persisting when no record matches. An error from
    /// `change` aborts the update and nothing is written.
    fn update(
        &self,
        id: &str,
        change: &mut dyn FnMut(&mut T) -> PortResult<()>,
    ) -> PortResult<bool>;

    /// Removes every record with key `id`. Returns `true` iff something was removed.
    fn delete(&self, id: &str) -> PortResult<bool>;
}
