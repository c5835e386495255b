//! crates/blog_core/src/repository.rs
//!
//! The generic `Repository` implementation shared by users and posts.
//! Every operation is a full load, an in-memory change, and a full save.
//! There is no locking across that window; callers that mutate from several
//! threads must serialize writes themselves.

use std::sync::Arc;

use crate::ports::{CollectionStore, PortResult, Record, Repository};

/// A `Repository` backed by any whole-collection store.
pub struct CollectionRepository<T> {
    store: Arc<dyn CollectionStore<T>>,
}

impl<T> CollectionRepository<T> {
    pub fn new(store: Arc<dyn CollectionStore<T>>) -> Self {
        Self { store }
    }
}

impl<T> Clone for CollectionRepository<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<T: Record> Repository<T> for CollectionRepository<T> {
    fn list(&self) -> PortResult<Vec<T>> {
        self.store.load()
    }

    fn find_by_id(&self, id: &str) -> PortResult<Option<T>> {
        Ok(self.store.load()?.into_iter().find(|r| r.key() == id))
    }

    fn insert(&self, record: T) -> PortResult<()> {
        let mut records = self.store.load()?;
        records.push(record);
        self.store.save(&records)
    }

    fn update(
        &self,
        id: &str,
        change: &mut dyn FnMut(&mut T) -> PortResult<()>,
    ) -> PortResult<bool> {
        let mut records = self.store.load()?;
        let Some(record) = records.iter_mut().find(|r| r.key() == id) else {
            return Ok(false);
        };
        change(record)?;
        self.store.save(&records)?;
        Ok(true)
    }

    fn delete(&self, id: &str) -> PortResult<bool> {
        let mut records = self.store.load()?;
        let before = records.len();
        records.retain(|r| r.key() != id);
        if records.len() == before {
            return Ok(false);
        }
        self.store.save(&records)?;
        Ok(true)
    }
}
