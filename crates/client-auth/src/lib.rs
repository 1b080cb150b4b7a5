//! Authentication session core for the Crewgate client.
//!
//! This crate provides:
//! - Pure expiry math for the access/refresh token pair
//! - An explicit FSM for authentication state
//! - The [`SessionManager`] orchestrating login, logout, and coalesced
//!   token refresh over injected transport and storage ports

mod auth_fsm;
mod error;
pub mod expiry;
mod session;
mod transport;

pub use auth_fsm::session_machine;
pub use auth_fsm::{
    SessionChangedPayload, SessionMachine, SessionMachineInput, SessionMachineState, SessionState,
};
pub use error::{AuthError, AuthResult};
pub use session::{LoginCredentials, SessionListener, SessionManager, UserPatch};
pub use transport::{AuthResponse, AuthTransport, LogoutResponse, TokenBinder};

pub use client_storage::{UserRecord, UserRole};
