pub mod domain;
pub mod ports;
pub mod posts;
pub mod repository;
pub mod store;
pub mod users;

pub use domain::{Comment, Post, User};
pub use ports::{CollectionStore, PortError, PortResult, Record, Repository};
pub use posts::PostRepository;
pub use repository::CollectionRepository;
pub use store::{JsonFileStore, MemoryStore, POSTS_FILE, USERS_FILE};
pub use users::{verify_password, UserRepository};
