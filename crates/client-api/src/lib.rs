//! REST API client for the Crewgate backend.
//!
//! Provides the [`ApiClient`] implementing the session core's
//! `AuthTransport` (login/refresh/logout) and `TokenBinder` (default bearer
//! header) ports over reqwest.

mod client;

pub use client::{ApiClient, ApiConfig};
