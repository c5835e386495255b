//! services/api/src/adapters/uploads.rs
//!
//! Stores uploaded media files on disk and hands back the URL each one is
//! served under. Only whitelisted extensions are accepted, and client file
//! names are reduced to a safe ASCII form before touching the filesystem.

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;
use uuid::Uuid;

/// Extensions accepted for media attachments (compared lowercase).
pub const ALLOWED_EXTENSIONS: &[&str] = &[
    "txt", "pdf", "png", "jpg", "jpeg", "gif", "mp3", "mp4", "mov",
];

/// URL prefix uploaded files are served under.
pub const UPLOAD_URL_PREFIX: &str = "/static/uploads";

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("File \"{0}\" is not allowed or is invalid")]
    NotAllowed(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Returns true if `file_name` carries an allowed extension.
pub fn allowed_file(file_name: &str) -> bool {
    match file_name.rsplit_once('.') {
        Some((_, ext)) => ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()),
        None => false,
    }
}

fn unsafe_chars() -> &'static Regex {
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    UNSAFE.get_or_init(|| Regex::new(r"[^A-Za-z0-9_.-]").expect("static regex is valid"))
}

/// Reduces a client-supplied name to `[A-Za-z0-9_.-]`, with no directory
/// parts and no leading or trailing dots/underscores. May return an empty string.
pub fn secure_filename(file_name: &str) -> String {
    let ascii: String = file_name
        .chars()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();
    let joined = ascii.split_whitespace().collect::<Vec<_>>().join("_");
    unsafe_chars()
        .replace_all(&joined, "")
        .trim_matches(|c: char| c == '.' || c == '_')
        .to_string()
}

/// Writes uploads into a single directory.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Creates the upload directory if needed.
    pub async fn ensure_dir(&self) -> Result<(), UploadError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    /// Validates `file_name` and picks the name it will be stored under.
    ///
    /// A random prefix keeps two uploads with the same client name from
    /// overwriting each other.
    pub fn stored_name(&self, file_name: &str) -> Result<String, UploadError> {
        if !allowed_file(file_name) {
            return Err(UploadError::NotAllowed(file_name.to_string()));
        }
        let safe = secure_filename(file_name);
        if !allowed_file(&safe) {
            return Err(UploadError::NotAllowed(file_name.to_string()));
        }
        let prefix = Uuid::new_v4().simple().to_string();
        Ok(format!("{}_{}", &prefix[..8], safe))
    }

    /// Saves one file and returns the URL it is served under.
    pub async fn save(&self, file_name: &str, data: &[u8]) -> Result<String, UploadError> {
        let name = self.stored_name(file_name)?;
        tokio::fs::write(self.dir.join(&name), data).await?;
        debug!(file = %name, bytes = data.len(), "Stored upload");
        Ok(format!("{}/{}", UPLOAD_URL_PREFIX, name))
    }

    /// Deletes a file previously returned by [`UploadStore::save`].
    ///
    /// URLs outside the upload prefix, or naming anything but a plain file in
    /// the upload directory, are ignored. A file that is already gone is fine.
    pub async fn remove(&self, url: &str) -> Result<(), UploadError> {
        let name = match url
            .strip_prefix(UPLOAD_URL_PREFIX)
            .and_then(|rest| rest.strip_prefix('/'))
        {
            Some(name) if !name.is_empty() && secure_filename(name) == name => name,
            _ => return Ok(()),
        };
        match tokio::fs::remove_file(self.dir.join(name)).await {
            Ok(()) => {
                debug!(file = %name, "Removed upload");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
