//! crates/blog_core/src/store.rs
//!
//! Concrete `CollectionStore` implementations: a JSON array file on disk, and
//! an in-memory vector used as a test double.

use std::fs;
use std::io::{ErrorKind, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::ports::{CollectionStore, PortError, PortResult};

/// File name of the user collection inside the data directory.
pub const USERS_FILE: &str = "users.json";
/// File name of the post collection inside the data directory.
pub const POSTS_FILE: &str = "posts.json";

//=========================================================================================
// JSON File Store
//=========================================================================================

/// Stores one collection as a pretty-printed JSON array in a single file.
///
/// Missing or unparseable files read as an empty collection. Saves go to a
/// sibling `.tmp` file first and are renamed over the target, so readers
/// never observe a half-written array.
pub struct JsonFileStore<T> {
    path: PathBuf,
    _record: PhantomData<fn() -> T>,
}

impl<T> JsonFileStore<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _record: PhantomData,
        }
    }

    /// Opens the store for `file_name` inside `data_dir`.
    pub fn in_dir(data_dir: impl AsRef<Path>, file_name: &str) -> Self {
        Self::new(data_dir.as_ref().join(file_name))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the backing file as an empty array if it does not exist yet.
    pub fn ensure_exists(&self) -> PortResult<()> {
        if self.path.exists() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, b"[]")?;
        debug!(path = %self.path.display(), "Created empty collection file");
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

impl<T> CollectionStore<T> for JsonFileStore<T>
where
    T: Serialize + DeserializeOwned,
{
    fn load(&self) -> PortResult<Vec<T>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Collection file missing, treating as empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(PortError::Storage(e)),
        };

        match serde_json::from_slice::<Vec<T>>(&bytes) {
            Ok(records) => Ok(records),
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Collection file is not a valid JSON array, treating as empty"
                );
                Ok(Vec::new())
            }
        }
    }

    fn save(&self, records: &[T]) -> PortResult<()> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        records.serialize(&mut serializer)?;

        let tmp = self.temp_path();
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&buf)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), count = records.len(), "Saved collection");
        Ok(())
    }
}

//=========================================================================================
// In-Memory Store
//=========================================================================================

/// Keeps the collection in a vector. Used by tests in place of the filesystem.
pub struct MemoryStore<T> {
    records: Mutex<Vec<T>>,
}

impl<T> MemoryStore<T> {
    pub fn new() -> Self {
        Self::with_records(Vec::new())
    }

    pub fn with_records(records: Vec<T>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }
}

impl<T> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> CollectionStore<T> for MemoryStore<T>
where
    T: Clone + Send,
{
    fn load(&self) -> PortResult<Vec<T>> {
        let guard = self
            .records
            .lock()
            .map_err(|_| PortError::Unexpected("memory store lock poisoned".to_string()))?;
        Ok(guard.clone())
    }

    fn save(&self, records: &[T]) -> PortResult<()> {
        let mut guard = self
            .records
            .lock()
            .map_err(|_| PortError::Unexpected("memory store lock poisoned".to_string()))?;
        *guard = records.to_vec();
        Ok(())
    }
}
