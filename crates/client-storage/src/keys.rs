//! Storage key constants.

/// Storage keys used by the client
pub struct StorageKeys;

impl StorageKeys {
    /// Persisted session snapshot (JSON)
    pub const SESSION_RECORD: &'static str = "session_record";
}
