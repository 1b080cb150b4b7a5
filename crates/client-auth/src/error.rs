//! Authentication error types.

use client_storage::UserRole;
use thiserror::Error;

/// Authentication error type.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Network unreachable, timed out, or the backend answered with an
    /// unusable response. Timeouts are deliberately not a separate kind.
    #[error("Transport failure: {0}")]
    Transport(String),

    /// Backend explicitly rejected the username/password
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Credentials were valid but the account role is not permitted here
    #[error("Account role {0:?} is not permitted on this client")]
    WrongRole(UserRole),

    /// Backend refused the refresh token (expired, revoked, reused)
    #[error("Refresh token rejected: {0}")]
    RefreshRejected(String),

    /// An operation requiring a session was invoked without one
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Invalid transition in the session FSM
    #[error("Invalid session state transition: {0}")]
    InvalidStateTransition(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] client_storage::StorageError),
}

/// Result type alias using AuthError.
pub type AuthResult<T> = Result<T, AuthError>;
