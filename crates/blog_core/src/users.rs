//! crates/blog_core/src/users.rs
//!
//! Registration and credential lookup over the user collection.

use std::sync::Arc;

use argon2::Argon2;
use password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use tracing::{debug, warn};

use crate::domain::User;
use crate::ports::{CollectionStore, PortError, PortResult, Repository};
use crate::repository::CollectionRepository;

/// CRUD over users. Usernames are unique and compared exactly (case-sensitive).
#[derive(Clone)]
pub struct UserRepository {
    users: Arc<dyn Repository<User>>,
}

impl UserRepository {
    /// Creates a `UserRepository` over a whole-collection store.
    pub fn new(store: Arc<dyn CollectionStore<User>>) -> Self {
        Self::with_repository(Arc::new(CollectionRepository::new(store)))
    }

    pub fn with_repository(users: Arc<dyn Repository<User>>) -> Self {
        Self { users }
    }

    /// Registers `username`. Returns `Ok(false)` if the name is already taken.
    ///
    /// The existence check and the save are not atomic; two concurrent calls
    /// with the same new name can both succeed unless writes are serialized.
    pub fn add_user(&self, username: &str, password: &str) -> PortResult<bool> {
        if password.trim().is_empty() {
            return Err(PortError::InvalidInput("password must not be empty".to_string()));
        }
        if self.users.find_by_id(username)?.is_some() {
            debug!(username, "Registration rejected, username taken");
            return Ok(false);
        }

        let user = User::new(username, hash_password(password)?)?;
        self.users.insert(user)?;
        debug!(username, "Registered user");
        Ok(true)
    }

    /// Returns the first user whose name matches exactly.
    pub fn find_user(&self, username: &str) -> PortResult<Option<User>> {
        self.users.find_by_id(username)
    }

    /// Checks `candidate` against a stored hash using Argon2's own verifier.
    /// A stored value that is not a valid PHC string never verifies.
    pub fn verify_password(stored_hash: &str, candidate: &str) -> bool {
        verify_password(stored_hash, candidate)
    }
}

/// Hashes `password` with Argon2 and a random salt, returning a PHC string.
pub fn hash_password(password: &str) -> PortResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PortError::Unexpected(format!("Failed to hash password: {}", e)))
}

/// See [`UserRepository::verify_password`].
pub fn verify_password(stored_hash: &str, candidate: &str) -> bool {
    let parsed = match PasswordHash::new(stored_hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("Stored password hash could not be parsed: {}", e);
            return false;
        }
    };
    Argon2::default()
        .verify_password(candidate.as_bytes(), &parsed)
        .is_ok()
}
