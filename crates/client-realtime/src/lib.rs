//! Realtime hub client for the Crewgate backend.
//!
//! Maintains a WebSocket connection that authenticates with a fresh access
//! token on every connect and rejoins the user-specific group after every
//! successful handshake. Connection failures degrade to a no-realtime mode
//! without affecting REST authentication.

mod client;
mod error;
mod messages;

pub use client::{
    attach_to_session, ConnectionState, HubClient, HubConfig, HubEvent, HubIdentity,
    HubTokenSource,
};
pub use error::{HubError, HubResult};
pub use messages::{user_group, AuthResultPayload, HubMessage, HubMessageType};
