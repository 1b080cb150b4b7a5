//! High-level API for the persisted session snapshot.

use crate::{SecureStorage, StorageKeys, StorageResult};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Schema version written into every persisted snapshot. Records with any
/// other version are discarded on load rather than migrated in place.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Account role reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Collaborator,
    Organizer,
    Admin,
}

/// Profile snapshot returned by the backend at login/refresh time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    pub role: UserRole,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

/// Persisted snapshot of the authentication session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedSession {
    pub schema_version: u32,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    /// Absolute access-token expiry, milliseconds since epoch.
    pub access_token_expires_at: Option<i64>,
    /// Absolute refresh-token expiry, milliseconds since epoch.
    pub refresh_token_expires_at: Option<i64>,
    pub user: Option<UserRecord>,
    pub is_authenticated: bool,
}

impl PersistedSession {
    /// The signed-out snapshot.
    pub fn empty() -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            access_token: None,
            refresh_token: None,
            access_token_expires_at: None,
            refresh_token_expires_at: None,
            user: None,
            is_authenticated: false,
        }
    }

    /// True when both credentials are present.
    pub fn has_token_pair(&self) -> bool {
        self.access_token.is_some() && self.refresh_token.is_some()
    }
}

impl Default for PersistedSession {
    fn default() -> Self {
        Self::empty()
    }
}

/// Durable store for the session snapshot.
///
/// `load` is best-effort and never fails: missing, corrupted, or
/// wrong-schema data all come back as the empty session so boot can proceed.
pub struct SessionStore {
    storage: Box<dyn SecureStorage>,
}

impl SessionStore {
    /// Create a session store over the given storage backend.
    pub fn new(storage: Box<dyn SecureStorage>) -> Self {
        Self { storage }
    }

    /// Load the last-written snapshot, or the empty session.
    pub fn load(&self) -> PersistedSession {
        let json = match self.storage.get(StorageKeys::SESSION_RECORD) {
            Ok(Some(json)) => json,
            Ok(None) => return PersistedSession::empty(),
            Err(err) => {
                warn!(error = %err, "Failed reading persisted session, starting signed out");
                return PersistedSession::empty();
            }
        };

        let session: PersistedSession = match serde_json::from_str(&json) {
            Ok(session) => session,
            Err(err) => {
                warn!(error = %err, "Corrupted persisted session, starting signed out");
                return PersistedSession::empty();
            }
        };

        if session.schema_version != CURRENT_SCHEMA_VERSION {
            warn!(
                found = session.schema_version,
                expected = CURRENT_SCHEMA_VERSION,
                "Unknown session schema version, starting signed out"
            );
            return PersistedSession::empty();
        }

        session
    }

    /// Write the snapshot as a single record.
    pub fn save(&self, session: &PersistedSession) -> StorageResult<()> {
        let json = serde_json::to_string(session)
            .map_err(|e| crate::StorageError::Encoding(e.to_string()))?;
        self.storage.set(StorageKeys::SESSION_RECORD, &json)
    }

    /// Remove the persisted snapshot.
    pub fn clear(&self) -> StorageResult<()> {
        let _ = self.storage.delete(StorageKeys::SESSION_RECORD)?;
        Ok(())
    }
}
