pub mod sessions;
pub mod storage;
pub mod uploads;

pub use sessions::SessionStore;
pub use storage::open_repositories;
pub use uploads::{UploadError, UploadStore};
