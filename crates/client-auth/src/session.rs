//! Session lifecycle management with coalesced token refresh.
//!
//! The [`SessionManager`] owns the session as the single source of truth.
//! Collaborators (the REST client, the realtime hub, the UI layer) read it
//! through getters and subscribe to state changes; they never mutate it.

use crate::auth_fsm::{SessionChangedPayload, SessionMachine, SessionMachineInput, SessionState};
use crate::expiry::{self, REQUEST_REFRESH_BUFFER_MINUTES, STARTUP_REFRESH_BUFFER_MINUTES};
use crate::transport::{AuthTransport, TokenBinder};
use crate::{AuthError, AuthResult};
use client_storage::{PersistedSession, SessionStore, UserRecord, UserRole, CURRENT_SCHEMA_VERSION};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Only collaborator accounts may hold a session on this client.
const REQUIRED_ROLE: UserRole = UserRole::Collaborator;

/// Remote logout is advisory; local cleanup never waits longer than this.
const REMOTE_LOGOUT_TIMEOUT: Duration = Duration::from_secs(5);

/// Username/password pair for an interactive login.
#[derive(Debug, Clone)]
pub struct LoginCredentials {
    pub username: String,
    pub password: String,
}

/// Shallow patch applied to the cached user record after a profile edit.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Callback type for session change notifications.
pub type SessionListener = Box<dyn Fn(SessionChangedPayload) + Send + Sync>;

/// Session manager for the access/refresh token pair.
///
/// The FSM tracks transient states (authenticating, refreshing) that aren't
/// persisted, while the session snapshot itself lives in the injected
/// [`SessionStore`]. Constructed once at process start and handed by
/// reference to every collaborator.
pub struct SessionManager {
    store: SessionStore,
    transport: Arc<dyn AuthTransport>,
    binder: Arc<dyn TokenBinder>,
    session: RwLock<PersistedSession>,
    /// Internal FSM for tracking session state transitions.
    fsm: Mutex<SessionMachine>,
    /// Serializes refresh attempts so concurrent triggers collapse onto one
    /// transport call.
    refresh_gate: tokio::sync::Mutex<()>,
    /// Listeners notified on every state change.
    listeners: Mutex<Vec<SessionListener>>,
}

impl SessionManager {
    /// Create a new session manager over the injected ports.
    pub fn new(
        store: SessionStore,
        transport: Arc<dyn AuthTransport>,
        binder: Arc<dyn TokenBinder>,
    ) -> Self {
        Self {
            store,
            transport,
            binder,
            session: RwLock::new(PersistedSession::empty()),
            fsm: Mutex::new(SessionMachine::new()),
            refresh_gate: tokio::sync::Mutex::new(()),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Register a listener notified on session state changes.
    pub fn on_session_change(&self, listener: SessionListener) {
        self.listeners.lock().unwrap().push(listener);
    }

    /// Current FSM state.
    pub fn state(&self) -> SessionState {
        SessionState::from(self.fsm.lock().unwrap().state())
    }

    /// True when a token pair is held and the refresh token has not expired.
    pub fn is_authenticated(&self) -> bool {
        let session = self.session.read().unwrap();
        session.is_authenticated
            && session.refresh_token.is_some()
            && !expiry::is_expired(session.refresh_token_expires_at)
    }

    /// Current access token, if any.
    pub fn get_access_token(&self) -> Option<String> {
        self.session.read().unwrap().access_token.clone()
    }

    /// Current user ID, if a session is held.
    pub fn get_user_id(&self) -> Option<String> {
        self.session
            .read()
            .unwrap()
            .user
            .as_ref()
            .map(|user| user.id.clone())
    }

    /// Current user record, if a session is held.
    pub fn current_user(&self) -> Option<UserRecord> {
        self.session.read().unwrap().user.clone()
    }

    /// Transition the FSM and notify listeners if the state changed.
    fn transition(&self, input: &SessionMachineInput) -> AuthResult<SessionState> {
        let mut fsm = self.fsm.lock().unwrap();
        let old_state = SessionState::from(fsm.state());

        fsm.consume(input).map_err(|_| {
            AuthError::InvalidStateTransition(format!(
                "Cannot apply {:?} in state {:?}",
                input,
                fsm.state()
            ))
        })?;

        let new_state = SessionState::from(fsm.state());
        drop(fsm);

        if old_state != new_state {
            debug!(
                old_state = ?old_state,
                new_state = ?new_state,
                "Session state transition"
            );
            self.notify_session_change(&new_state);
        }

        Ok(new_state)
    }

    /// Notify listeners of a state change.
    fn notify_session_change(&self, state: &SessionState) {
        let (user_id, username) = {
            let session = self.session.read().unwrap();
            (
                session.user.as_ref().map(|user| user.id.clone()),
                session.user.as_ref().map(|user| user.username.clone()),
            )
        };

        let listeners = self.listeners.lock().unwrap();
        for listener in listeners.iter() {
            listener(SessionChangedPayload {
                state: state.clone(),
                user_id: user_id.clone(),
                username: username.clone(),
            });
        }
    }

    /// Log in with username and password.
    ///
    /// On success the full session is written, persisted, and the access
    /// token is bound to the transport. Any failure leaves the session
    /// exactly as it was and re-raises the error.
    pub async fn login(&self, credentials: &LoginCredentials) -> AuthResult<()> {
        if credentials.username.trim().is_empty() || credentials.password.is_empty() {
            return Err(AuthError::InvalidCredentials(
                "Username and password are required".to_string(),
            ));
        }

        self.transition(&SessionMachineInput::LoginAttempt)?;

        debug!(username = %credentials.username, "Attempting login");

        let response = match self
            .transport
            .login(&credentials.username, &credentials.password)
            .await
        {
            Ok(response) => response,
            Err(err) => {
                let _ = self.transition(&SessionMachineInput::LoginFailed);
                return Err(err);
            }
        };

        if !response.success {
            let message = response
                .message
                .unwrap_or_else(|| "Login rejected".to_string());
            warn!(message = %message, "Login failed");
            let _ = self.transition(&SessionMachineInput::LoginFailed);
            return Err(AuthError::InvalidCredentials(message));
        }

        let (user, access_token, refresh_token, expires_in) = match (
            response.user,
            response.access_token,
            response.refresh_token,
            response.expires_in,
        ) {
            (Some(user), Some(access), Some(refresh), Some(expires_in)) => {
                (user, access, refresh, expires_in)
            }
            _ => {
                let _ = self.transition(&SessionMachineInput::LoginFailed);
                return Err(AuthError::Transport(
                    "Login response is missing token material".to_string(),
                ));
            }
        };

        if user.role != REQUIRED_ROLE {
            // Token material received for a disallowed role is dropped here;
            // nothing is persisted or bound.
            warn!(user_id = %user.id, role = ?user.role, "Login rejected for disallowed role");
            let _ = self.transition(&SessionMachineInput::LoginFailed);
            return Err(AuthError::WrongRole(user.role));
        }

        let record = PersistedSession {
            schema_version: CURRENT_SCHEMA_VERSION,
            access_token: Some(access_token.clone()),
            refresh_token: Some(refresh_token),
            access_token_expires_at: Some(expiry::calculate_expiry_time(expires_in)),
            // The refresh-token lifetime is a local constant; the backend
            // does not report it.
            refresh_token_expires_at: Some(expiry::refresh_token_expiry_time()),
            user: Some(user.clone()),
            is_authenticated: true,
        };

        if let Err(err) = self.store.save(&record) {
            let _ = self.transition(&SessionMachineInput::LoginFailed);
            return Err(err.into());
        }

        *self.session.write().unwrap() = record;
        self.binder.set_auth_token(Some(&access_token));
        self.transition(&SessionMachineInput::LoginSucceeded)?;

        info!(user_id = %user.id, "Login successful");

        Ok(())
    }

    /// Log out, clearing all session state.
    ///
    /// The remote call is best-effort notification; local cleanup (session
    /// fields, persisted store, transport header) runs unconditionally.
    /// Invoked both interactively and as the terminal step of a failed
    /// refresh.
    pub async fn logout(&self) -> AuthResult<()> {
        let _ = self.transition(&SessionMachineInput::LogoutRequested);

        match tokio::time::timeout(REMOTE_LOGOUT_TIMEOUT, self.transport.logout()).await {
            Ok(Ok(ack)) if !ack.success => {
                debug!("Backend declined logout notification");
            }
            Ok(Ok(_)) => {}
            Ok(Err(err)) => {
                warn!(error = %err, "Remote logout failed, clearing local session anyway");
            }
            Err(_) => {
                warn!("Remote logout timed out, clearing local session anyway");
            }
        }

        *self.session.write().unwrap() = PersistedSession::empty();
        if let Err(err) = self.store.clear() {
            warn!(error = %err, "Failed clearing persisted session");
        }
        self.binder.set_auth_token(None);

        info!("Logged out");
        Ok(())
    }

    /// Exchange the refresh token for a new token pair.
    ///
    /// Overwrites the whole pair, both expiries, and the user record — the
    /// backend may rotate the refresh token itself. Any failure forces a
    /// full logout before the error is re-raised, so callers can rely on
    /// the session being clean.
    pub async fn refresh_auth_token(&self) -> AuthResult<()> {
        let _guard = self.refresh_gate.lock().await;
        self.refresh_locked().await
    }

    /// Refresh body. Caller must hold `refresh_gate`.
    async fn refresh_locked(&self) -> AuthResult<()> {
        let refresh_token = self
            .session
            .read()
            .unwrap()
            .refresh_token
            .clone()
            .ok_or(AuthError::NotAuthenticated)?;

        let _ = self.transition(&SessionMachineInput::TokenExpired);

        let response = match self.transport.refresh(&refresh_token).await {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "Token refresh transport failure, forcing logout");
                self.force_logout().await;
                return Err(err);
            }
        };

        if !response.success {
            let message = response
                .message
                .unwrap_or_else(|| "Refresh rejected".to_string());
            warn!(message = %message, "Refresh token rejected, forcing logout");
            self.force_logout().await;
            return Err(AuthError::RefreshRejected(message));
        }

        let (user, access_token, new_refresh_token, expires_in) = match (
            response.user,
            response.access_token,
            response.refresh_token,
            response.expires_in,
        ) {
            (Some(user), Some(access), Some(refresh), Some(expires_in)) => {
                (user, access, refresh, expires_in)
            }
            _ => {
                warn!("Refresh response is missing token material, forcing logout");
                self.force_logout().await;
                return Err(AuthError::Transport(
                    "Refresh response is missing token material".to_string(),
                ));
            }
        };

        let record = PersistedSession {
            schema_version: CURRENT_SCHEMA_VERSION,
            access_token: Some(access_token.clone()),
            refresh_token: Some(new_refresh_token),
            access_token_expires_at: Some(expiry::calculate_expiry_time(expires_in)),
            refresh_token_expires_at: Some(expiry::refresh_token_expiry_time()),
            user: Some(user.clone()),
            is_authenticated: true,
        };

        if let Err(err) = self.store.save(&record) {
            warn!(error = %err, "Failed persisting refreshed session, forcing logout");
            self.force_logout().await;
            return Err(err.into());
        }

        *self.session.write().unwrap() = record;
        self.binder.set_auth_token(Some(&access_token));
        let _ = self.transition(&SessionMachineInput::RefreshSucceeded);

        info!(user_id = %user.id, "Token refreshed");

        Ok(())
    }

    /// Terminal step of a failed refresh: complete the logout before the
    /// refresh error propagates.
    async fn force_logout(&self) {
        let _ = self.transition(&SessionMachineInput::RefreshFailed);
        if let Err(err) = self.logout().await {
            warn!(error = %err, "Cleanup after failed refresh did not fully complete");
        }
    }

    /// Reconcile the persisted session against current time at process
    /// start.
    ///
    /// Returns:
    /// - `Ok(true)` if a session is valid or was successfully refreshed
    /// - `Ok(false)` if no usable session exists
    /// - `Err(...)` if the startup refresh failed (session already cleared)
    pub async fn check_auth_status(&self) -> AuthResult<bool> {
        let restored = self.store.load();

        if !restored.has_token_pair() {
            info!("No persisted session found on startup");
            *self.session.write().unwrap() = PersistedSession::empty();
            return Ok(false);
        }

        if expiry::is_expired(restored.refresh_token_expires_at) {
            info!("Persisted refresh token already expired, clearing session");
            let _ = self.logout().await;
            return Ok(false);
        }

        *self.session.write().unwrap() = restored.clone();
        self.transition(&SessionMachineInput::SessionRestored)?;

        if expiry::is_expiring_soon(
            restored.access_token_expires_at,
            STARTUP_REFRESH_BUFFER_MINUTES,
        ) {
            info!("Restored access token expired or expiring soon, refreshing before use");
            let _guard = self.refresh_gate.lock().await;
            self.refresh_locked().await?;
            return Ok(true);
        }

        // Token comfortably valid: bind it without a network call.
        if let Some(token) = restored.access_token.as_deref() {
            self.binder.set_auth_token(Some(token));
        }

        info!(
            user_id = %restored
                .user
                .as_ref()
                .map(|user| user.id.as_str())
                .unwrap_or("<unknown>"),
            "Session restored from storage"
        );
        Ok(true)
    }

    /// Gate for outbound authenticated API calls.
    ///
    /// Returns `false` without a session, `false` after forcing logout when
    /// the refresh token has expired, and otherwise refreshes transparently
    /// when the access token is inside the hot-path buffer.
    pub async fn ensure_valid_token(&self) -> bool {
        let (has_access, access_expires_at, refresh_expires_at) = {
            let session = self.session.read().unwrap();
            (
                session.access_token.is_some(),
                session.access_token_expires_at,
                session.refresh_token_expires_at,
            )
        };

        if !has_access {
            return false;
        }

        if expiry::is_expired(refresh_expires_at) {
            warn!("Refresh token expired, forcing logout");
            let _ = self.logout().await;
            return false;
        }

        if !expiry::is_expiring_soon(access_expires_at, REQUEST_REFRESH_BUFFER_MINUTES) {
            return true;
        }

        // Coalesce concurrent refresh triggers: the first caller through the
        // gate refreshes, the rest re-check and find a fresh token.
        let _guard = self.refresh_gate.lock().await;

        let (has_refresh, access_expires_at) = {
            let session = self.session.read().unwrap();
            (
                session.refresh_token.is_some(),
                session.access_token_expires_at,
            )
        };

        if !has_refresh {
            // Logged out while waiting on the gate.
            return false;
        }

        if !expiry::is_expiring_soon(access_expires_at, REQUEST_REFRESH_BUFFER_MINUTES) {
            return true;
        }

        match self.refresh_locked().await {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "Transparent refresh failed");
                false
            }
        }
    }

    /// Shallow-merge a profile patch into the cached user record.
    ///
    /// No-op when unauthenticated. Persists the merged record so the edit
    /// survives a restart; tokens are untouched.
    pub fn update_user(&self, patch: &UserPatch) -> AuthResult<()> {
        let record = {
            let mut session = self.session.write().unwrap();
            if !session.is_authenticated {
                return Ok(());
            }
            let Some(user) = session.user.as_mut() else {
                return Ok(());
            };

            if let Some(username) = &patch.username {
                user.username = username.clone();
            }
            if let Some(email) = &patch.email {
                user.email = Some(email.clone());
            }
            if let Some(first_name) = &patch.first_name {
                user.first_name = Some(first_name.clone());
            }
            if let Some(last_name) = &patch.last_name {
                user.last_name = Some(last_name.clone());
            }

            session.clone()
        };

        self.store.save(&record)?;
        self.notify_session_change(&self.state());
        Ok(())
    }
}
