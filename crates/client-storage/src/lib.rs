//! Durable session storage for the Crewgate client.
//!
//! This crate provides:
//! - A [`SecureStorage`] trait for key-value credential storage
//! - A file-backed adapter with atomic writes ([`FileStorage`])
//! - An in-memory adapter for tests and ephemeral profiles ([`MemoryStorage`])
//! - The high-level [`SessionStore`] persisting the session snapshot

mod file;
mod keys;
mod memory;
mod session_store;
mod traits;

pub use file::FileStorage;
pub use keys::StorageKeys;
pub use memory::MemoryStorage;
pub use session_store::{
    PersistedSession, SessionStore, UserRecord, UserRole, CURRENT_SCHEMA_VERSION,
};
pub use traits::SecureStorage;

use std::path::PathBuf;
use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Key not found
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Create the default file-backed storage at the given path.
pub fn create_storage(path: PathBuf) -> Box<dyn SecureStorage> {
    Box::new(FileStorage::new(path))
}

/// Create a SessionStore over the default file-backed storage.
pub fn create_session_store(path: PathBuf) -> SessionStore {
    SessionStore::new(create_storage(path))
}
