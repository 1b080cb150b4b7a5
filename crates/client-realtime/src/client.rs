//! WebSocket hub client.

use crate::{HubError, HubMessage, HubMessageType, HubResult};
use async_trait::async_trait;
use client_auth::{SessionManager, SessionState};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, Mutex, RwLock};
use tokio::time::{interval, Duration};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

/// Hub client configuration.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Hub URL (e.g., wss://hub.crewgate.app/events).
    pub url: String,
    /// Heartbeat interval in seconds.
    pub heartbeat_interval_secs: u64,
    /// Base reconnect delay in seconds.
    pub reconnect_base_delay_secs: u64,
    /// Maximum reconnect delay in seconds.
    pub reconnect_max_delay_secs: u64,
    /// Maximum reconnect attempts before degrading to no-realtime mode.
    pub max_reconnect_attempts: u32,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            url: "wss://hub.crewgate.app/events".to_string(),
            heartbeat_interval_secs: 30,
            reconnect_base_delay_secs: 2,
            reconnect_max_delay_secs: 30,
            max_reconnect_attempts: 10,
        }
    }
}

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Authenticating,
    Connected,
}

/// Events emitted by the hub client.
#[derive(Debug, Clone)]
pub enum HubEvent {
    /// Connected and authenticated with the hub.
    Connected,
    /// Disconnected from the hub.
    Disconnected(Option<String>),
    /// Authentication succeeded.
    Authenticated,
    /// Authentication failed.
    AuthenticationFailed(String),
    /// Joined a group.
    GroupJoined(String),
    /// Left a group.
    GroupLeft(String),
    /// Received a pushed message.
    Message(HubMessage),
    /// Error occurred.
    Error(String),
}

/// Identity material for a hub handshake.
#[derive(Debug, Clone)]
pub struct HubIdentity {
    pub access_token: String,
    pub user_id: String,
}

/// Token factory consulted at every connect and reconnect.
///
/// The hub never holds a static token: asking the session for a fresh one
/// at handshake time keeps the connection valid across refreshes.
#[async_trait]
pub trait HubTokenSource: Send + Sync {
    async fn hub_identity(&self) -> Option<HubIdentity>;
}

#[async_trait]
impl HubTokenSource for SessionManager {
    async fn hub_identity(&self) -> Option<HubIdentity> {
        // Runs the transparent-refresh gate first, so the handshake always
        // carries a token the backend will accept.
        if !self.ensure_valid_token().await {
            return None;
        }
        let access_token = self.get_access_token()?;
        let user_id = self.get_user_id()?;
        Some(HubIdentity {
            access_token,
            user_id,
        })
    }
}

/// WebSocket hub client with automatic reconnection.
pub struct HubClient {
    config: HubConfig,
    token_source: Arc<dyn HubTokenSource>,
    state: Arc<RwLock<ConnectionState>>,
    current_group: Arc<RwLock<Option<String>>>,
    sender: Arc<Mutex<Option<mpsc::Sender<Message>>>>,
    event_tx: broadcast::Sender<HubEvent>,
    reconnect_attempts: Arc<RwLock<u32>>,
}

impl HubClient {
    /// Create a new hub client with the given configuration.
    pub fn new(config: HubConfig, token_source: Arc<dyn HubTokenSource>) -> Self {
        let (event_tx, _) = broadcast::channel(100);

        Self {
            config,
            token_source,
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            current_group: Arc::new(RwLock::new(None)),
            sender: Arc::new(Mutex::new(None)),
            event_tx,
            reconnect_attempts: Arc::new(RwLock::new(0)),
        }
    }

    /// Subscribe to hub events.
    pub fn subscribe(&self) -> broadcast::Receiver<HubEvent> {
        self.event_tx.subscribe()
    }

    /// Get the current connection state.
    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    /// Check if connected.
    pub async fn is_connected(&self) -> bool {
        *self.state.read().await == ConnectionState::Connected
    }

    /// Get the currently joined group.
    pub async fn current_group(&self) -> Option<String> {
        self.current_group.read().await.clone()
    }

    /// Connect to the hub and drive the connection until it closes.
    ///
    /// Callers usually spawn this. A fresh token is fetched from the token
    /// source for this and every subsequent reconnect attempt.
    pub async fn connect(&self) -> HubResult<()> {
        let current_state = *self.state.read().await;
        if current_state != ConnectionState::Disconnected {
            debug!("Already connecting or connected");
            return Ok(());
        }

        self.do_connect().await
    }

    /// Internal connect implementation.
    async fn do_connect(&self) -> HubResult<()> {
        *self.state.write().await = ConnectionState::Connecting;

        // Token factory: never reuse a token captured at a previous connect.
        let identity = match self.token_source.hub_identity().await {
            Some(identity) => identity,
            None => {
                *self.state.write().await = ConnectionState::Disconnected;
                return Err(HubError::Authentication(
                    "No authenticated session for hub handshake".to_string(),
                ));
            }
        };

        info!(url = %self.config.url, "Connecting to hub");

        let (ws_stream, _) = match connect_async(&self.config.url).await {
            Ok(connected) => connected,
            Err(err) => {
                *self.state.write().await = ConnectionState::Disconnected;
                self.schedule_reconnect().await;
                return Err(err.into());
            }
        };
        let (mut write, mut read) = ws_stream.split();

        // Create message channel
        let (msg_tx, mut msg_rx) = mpsc::channel::<Message>(100);
        *self.sender.lock().await = Some(msg_tx.clone());

        *self.state.write().await = ConnectionState::Authenticating;

        let auth_msg = HubMessage::auth(&identity.access_token);
        let auth_json = auth_msg.to_json()?;
        write.send(Message::Text(auth_json.into())).await?;
        debug!("Sent AUTH message");

        // Spawn message sender task
        let sender_handle = tokio::spawn(async move {
            while let Some(msg) = msg_rx.recv().await {
                if write.send(msg).await.is_err() {
                    break;
                }
            }
        });

        // Spawn heartbeat task
        let heartbeat_sender = msg_tx.clone();
        let heartbeat_interval = self.config.heartbeat_interval_secs;
        let heartbeat_handle = tokio::spawn(async move {
            let mut interval = interval(Duration::from_secs(heartbeat_interval));
            loop {
                interval.tick().await;
                let heartbeat = HubMessage::heartbeat();
                if let Ok(json) = heartbeat.to_json() {
                    if heartbeat_sender
                        .send(Message::Text(json.into()))
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
            }
        });

        // Process incoming messages
        while let Some(msg_result) = read.next().await {
            match msg_result {
                Ok(Message::Text(text)) => match HubMessage::from_json(&text) {
                    Ok(hub_msg) => {
                        self.handle_message(&hub_msg, &identity.user_id).await;
                    }
                    Err(err) => {
                        warn!(error = %err, "Failed to parse hub message");
                    }
                },
                Ok(Message::Close(_)) => {
                    info!("Hub connection closed");
                    break;
                }
                Ok(Message::Ping(data)) => {
                    if let Some(sender) = self.sender.lock().await.as_ref() {
                        let _ = sender.send(Message::Pong(data)).await;
                    }
                }
                Ok(_) => {}
                Err(err) => {
                    error!(error = %err, "WebSocket error");
                    break;
                }
            }
        }

        // Cleanup
        heartbeat_handle.abort();
        sender_handle.abort();
        *self.sender.lock().await = None;
        *self.state.write().await = ConnectionState::Disconnected;
        *self.current_group.write().await = None;

        let _ = self.event_tx.send(HubEvent::Disconnected(None));

        // Attempt reconnection
        self.schedule_reconnect().await;

        Ok(())
    }

    /// Handle incoming hub message.
    async fn handle_message(&self, msg: &HubMessage, user_id: &str) {
        match msg.msg_type {
            HubMessageType::AuthResult => {
                if msg.success == Some(true) {
                    *self.state.write().await = ConnectionState::Connected;
                    *self.reconnect_attempts.write().await = 0;
                    info!("Authenticated with hub");
                    let _ = self.event_tx.send(HubEvent::Authenticated);
                    let _ = self.event_tx.send(HubEvent::Connected);

                    // Re-issue the user-group join on every successful
                    // handshake, reconnects included.
                    let group = crate::user_group(user_id);
                    if let Err(err) = self.send_message(HubMessage::join_group(&group)).await {
                        warn!(error = %err, group = %group, "Failed to request group join");
                    }
                } else {
                    let error = msg
                        .error
                        .clone()
                        .unwrap_or_else(|| "Unknown error".to_string());
                    *self.state.write().await = ConnectionState::Disconnected;
                    error!(error = %error, "Hub authentication failed");
                    let _ = self.event_tx.send(HubEvent::AuthenticationFailed(error));
                }
            }
            HubMessageType::Joined => {
                if let Some(group) = &msg.group {
                    *self.current_group.write().await = Some(group.clone());
                    info!(group = %group, "Joined group");
                    let _ = self.event_tx.send(HubEvent::GroupJoined(group.clone()));
                }
            }
            HubMessageType::Left => {
                if let Some(group) = &msg.group {
                    if self.current_group.read().await.as_deref() == Some(group) {
                        *self.current_group.write().await = None;
                    }
                    info!(group = %group, "Left group");
                    let _ = self.event_tx.send(HubEvent::GroupLeft(group.clone()));
                }
            }
            HubMessageType::Error => {
                let error = msg
                    .error
                    .clone()
                    .unwrap_or_else(|| "Unknown error".to_string());
                warn!(error = %error, "Hub error");
                let _ = self.event_tx.send(HubEvent::Error(error));
            }
            _ => {
                debug!(msg_type = ?msg.msg_type, "Received message");
                let _ = self.event_tx.send(HubEvent::Message(msg.clone()));
            }
        }
    }

    /// Schedule automatic reconnection.
    async fn schedule_reconnect(&self) {
        let mut attempts = self.reconnect_attempts.write().await;
        *attempts += 1;

        if *attempts > self.config.max_reconnect_attempts {
            warn!("Max reconnect attempts reached, realtime disabled until next login");
            return;
        }

        // Calculate delay with exponential backoff
        let delay = std::cmp::min(
            self.config.reconnect_base_delay_secs * 2u64.pow(*attempts - 1),
            self.config.reconnect_max_delay_secs,
        );

        info!(attempt = *attempts, delay_secs = delay, "Scheduling hub reconnect");

        drop(attempts);

        tokio::time::sleep(Duration::from_secs(delay)).await;

        if let Err(err) = Box::pin(self.do_connect()).await {
            error!(error = %err, "Hub reconnect failed");
        }
    }

    /// Disconnect from the hub and stop reconnecting.
    pub async fn disconnect(&self) {
        *self.reconnect_attempts.write().await = self.config.max_reconnect_attempts + 1;

        if let Some(sender) = self.sender.lock().await.take() {
            drop(sender);
        }

        *self.state.write().await = ConnectionState::Disconnected;
        *self.current_group.write().await = None;

        info!("Disconnected from hub");
        let _ = self
            .event_tx
            .send(HubEvent::Disconnected(Some("Client disconnected".to_string())));
    }

    /// Tear the connection down and reconnect with a freshly fetched token.
    pub async fn resync(&self) {
        self.disconnect().await;
        *self.reconnect_attempts.write().await = 0;

        if let Err(err) = self.connect().await {
            warn!(error = %err, "Hub resync failed");
        }
    }

    /// Join a group.
    pub async fn join_group(&self, group: &str) -> HubResult<()> {
        if !self.is_connected().await {
            return Err(HubError::NotConnected);
        }

        self.send_message(HubMessage::join_group(group)).await
    }

    /// Leave the current group.
    pub async fn leave_group(&self) -> HubResult<()> {
        if !self.is_connected().await {
            return Err(HubError::NotConnected);
        }

        let group = self
            .current_group
            .read()
            .await
            .clone()
            .ok_or_else(|| HubError::Group("Not in a group".to_string()))?;

        self.send_message(HubMessage::leave_group(&group)).await
    }

    /// Send a message to the hub.
    pub async fn send_message(&self, msg: HubMessage) -> HubResult<()> {
        let sender = self.sender.lock().await;
        let sender = sender.as_ref().ok_or(HubError::NotConnected)?;

        let json = msg.to_json()?;
        sender
            .send(Message::Text(json.into()))
            .await
            .map_err(|e| HubError::Send(e.to_string()))
    }
}

/// Wire the hub to the session lifecycle.
///
/// Forced logout tears the connection down; every transition into
/// `Authenticated` (login, boot restore, refresh success) resyncs the
/// connection so the handshake carries the current token.
pub fn attach_to_session(hub: &Arc<HubClient>, session: &SessionManager) {
    let hub = Arc::clone(hub);
    session.on_session_change(Box::new(move |payload| {
        let hub = Arc::clone(&hub);
        match payload.state {
            SessionState::Unauthenticated => {
                tokio::spawn(async move {
                    hub.disconnect().await;
                });
            }
            SessionState::Authenticated => {
                tokio::spawn(async move {
                    hub.resync().await;
                });
            }
            SessionState::Authenticating | SessionState::Refreshing => {}
        }
    }));
}
