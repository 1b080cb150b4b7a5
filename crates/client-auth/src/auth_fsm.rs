//! Authentication state machine using rust-fsm.
//!
//! ## State Diagram
//!
//! ```text
//! ┌─────────────────┐
//! │ Unauthenticated │ (initial)
//! └────────┬────────┘
//!          │ LoginAttempt            SessionRestored
//!          ▼                                │
//! ┌─────────────────┐                       │
//! │ Authenticating  │                       │
//! └────────┬────────┘                       │
//!          │ LoginSucceeded/LoginFailed     ▼
//!          ▼                        ┌─────────────────┐
//! ┌─────────────────┐  TokenExpired │                 │
//! │ Unauthenticated │◄──────────────┤  Authenticated  │
//! │   (on failure)  │               └────────┬────────┘
//! └─────────────────┘                        │ TokenExpired / LogoutRequested
//!                                            ▼
//!                                   ┌─────────────────┐
//!                                   │   Refreshing    │
//!                                   └────────┬────────┘
//!                                            │ RefreshSucceeded → Authenticated
//!                                            │ RefreshFailed    → Unauthenticated
//!                                            ▼
//! ```
//!
//! `Refreshing` is only ever entered from `Authenticated` and always resolves
//! back to `Authenticated` or, via forced logout, to `Unauthenticated`.

use rust_fsm::*;
use serde::{Deserialize, Serialize};

// Define the FSM using rust-fsm's declarative macro
// This generates a module `session_machine` with:
// - session_machine::State (enum)
// - session_machine::Input (enum)
// - session_machine::StateMachine (type alias)
// - session_machine::Impl (trait impl)
state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub session_machine(Unauthenticated)

    Unauthenticated => {
        LoginAttempt => Authenticating,
        // Boot path: a persisted session was restored without a network call
        SessionRestored => Authenticated
    },
    Authenticating => {
        LoginSucceeded => Authenticated,
        LoginFailed => Unauthenticated
    },
    Authenticated => {
        TokenExpired => Refreshing,
        LogoutRequested => Unauthenticated
    },
    Refreshing => {
        RefreshSucceeded => Authenticated,
        RefreshFailed => Unauthenticated
    }
}

// Re-export the generated types with clearer names
pub use session_machine::Input as SessionMachineInput;
pub use session_machine::State as SessionMachineState;
pub use session_machine::StateMachine as SessionMachine;

/// User-friendly session state for external consumption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No session.
    Unauthenticated,
    /// Login in flight.
    Authenticating,
    /// Valid session held.
    Authenticated,
    /// Token refresh in flight.
    Refreshing,
}

impl SessionState {
    /// Returns true if a session is held (Authenticated state only).
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated)
    }

    /// Returns true if the state is a transient/in-progress state.
    pub fn is_transient(&self) -> bool {
        matches!(self, SessionState::Authenticating | SessionState::Refreshing)
    }
}

impl From<&SessionMachineState> for SessionState {
    fn from(state: &SessionMachineState) -> Self {
        match state {
            SessionMachineState::Unauthenticated => SessionState::Unauthenticated,
            SessionMachineState::Authenticating => SessionState::Authenticating,
            SessionMachineState::Authenticated => SessionState::Authenticated,
            SessionMachineState::Refreshing => SessionState::Refreshing,
        }
    }
}

/// Payload for session state change events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionChangedPayload {
    /// Current session state.
    pub state: SessionState,
    /// User ID if a session is held.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Username if available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_unauthenticated() {
        let machine = SessionMachine::new();
        assert_eq!(*machine.state(), SessionMachineState::Unauthenticated);
    }

    #[test]
    fn test_login_flow() {
        let mut machine = SessionMachine::new();

        machine.consume(&SessionMachineInput::LoginAttempt).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::Authenticating);

        machine
            .consume(&SessionMachineInput::LoginSucceeded)
            .unwrap();
        assert_eq!(*machine.state(), SessionMachineState::Authenticated);
    }

    #[test]
    fn test_login_failure_returns_to_unauthenticated() {
        let mut machine = SessionMachine::new();

        machine.consume(&SessionMachineInput::LoginAttempt).unwrap();
        machine.consume(&SessionMachineInput::LoginFailed).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::Unauthenticated);
    }

    #[test]
    fn test_session_restore_skips_authenticating() {
        let mut machine = SessionMachine::new();

        machine
            .consume(&SessionMachineInput::SessionRestored)
            .unwrap();
        assert_eq!(*machine.state(), SessionMachineState::Authenticated);
    }

    #[test]
    fn test_token_expired_triggers_refresh() {
        let mut machine = SessionMachine::new();

        machine.consume(&SessionMachineInput::LoginAttempt).unwrap();
        machine
            .consume(&SessionMachineInput::LoginSucceeded)
            .unwrap();
        machine.consume(&SessionMachineInput::TokenExpired).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::Refreshing);
    }

    #[test]
    fn test_refresh_success_returns_to_authenticated() {
        let mut machine = SessionMachine::new();

        machine
            .consume(&SessionMachineInput::SessionRestored)
            .unwrap();
        machine.consume(&SessionMachineInput::TokenExpired).unwrap();
        machine
            .consume(&SessionMachineInput::RefreshSucceeded)
            .unwrap();
        assert_eq!(*machine.state(), SessionMachineState::Authenticated);
    }

    #[test]
    fn test_refresh_failure_clears_session() {
        let mut machine = SessionMachine::new();

        machine
            .consume(&SessionMachineInput::SessionRestored)
            .unwrap();
        machine.consume(&SessionMachineInput::TokenExpired).unwrap();
        machine
            .consume(&SessionMachineInput::RefreshFailed)
            .unwrap();
        assert_eq!(*machine.state(), SessionMachineState::Unauthenticated);
    }

    #[test]
    fn test_logout_from_authenticated() {
        let mut machine = SessionMachine::new();

        machine.consume(&SessionMachineInput::LoginAttempt).unwrap();
        machine
            .consume(&SessionMachineInput::LoginSucceeded)
            .unwrap();
        machine
            .consume(&SessionMachineInput::LogoutRequested)
            .unwrap();
        assert_eq!(*machine.state(), SessionMachineState::Unauthenticated);
    }

    #[test]
    fn test_refreshing_only_reachable_from_authenticated() {
        let mut machine = SessionMachine::new();

        // Cannot refresh without a session
        assert!(machine
            .consume(&SessionMachineInput::TokenExpired)
            .is_err());

        // Cannot refresh mid-login either
        machine.consume(&SessionMachineInput::LoginAttempt).unwrap();
        assert!(machine
            .consume(&SessionMachineInput::TokenExpired)
            .is_err());
    }

    #[test]
    fn test_invalid_transition_returns_error() {
        let mut machine = SessionMachine::new();

        assert!(machine
            .consume(&SessionMachineInput::LogoutRequested)
            .is_err());
        assert!(machine
            .consume(&SessionMachineInput::LoginSucceeded)
            .is_err());
    }

    #[test]
    fn test_session_state_conversion() {
        assert_eq!(
            SessionState::from(&SessionMachineState::Unauthenticated),
            SessionState::Unauthenticated
        );
        assert_eq!(
            SessionState::from(&SessionMachineState::Authenticating),
            SessionState::Authenticating
        );
        assert_eq!(
            SessionState::from(&SessionMachineState::Authenticated),
            SessionState::Authenticated
        );
        assert_eq!(
            SessionState::from(&SessionMachineState::Refreshing),
            SessionState::Refreshing
        );
    }

    #[test]
    fn test_session_state_is_authenticated() {
        assert!(!SessionState::Unauthenticated.is_authenticated());
        assert!(!SessionState::Authenticating.is_authenticated());
        assert!(SessionState::Authenticated.is_authenticated());
        assert!(!SessionState::Refreshing.is_authenticated());
    }

    #[test]
    fn test_session_state_is_transient() {
        assert!(!SessionState::Unauthenticated.is_transient());
        assert!(SessionState::Authenticating.is_transient());
        assert!(!SessionState::Authenticated.is_transient());
        assert!(SessionState::Refreshing.is_transient());
    }
}
