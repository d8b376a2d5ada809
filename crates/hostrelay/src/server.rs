//! `HostrelayServer` builder and server loops.
//!
//! This is the entry point for running Hostrelay. It ties together all the
//! layers: the HTTP API and the realtime listener on top, the session,
//! lobby and game authorities underneath, and the tick broadcaster on the
//! side.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use hostrelay_game::GameAuthority;
use hostrelay_lobby::{LobbyAuthority, LobbyStore};
use hostrelay_protocol::{Codec, GameServerMessage, JsonCodec, LobbyId, LobbyServerMessage, UserId};
use hostrelay_session::{AccountStore, SessionAuthority, SessionConfig, SessionValidator};
use hostrelay_transport::{PendingConnection, Transport, WebSocketTransport};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::broadcaster::TickBroadcaster;
use crate::groups::GroupRegistry;
use crate::handler::handle_connection;
use crate::{HostrelayError, ServerConfig};

/// How often expired and revoked sessions are deleted.
pub const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Shared server state passed to every HTTP handler and connection task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. The
/// session and lobby authorities synchronize internally; the game store
/// and the two group registries sit behind their own mutexes.
pub(crate) struct ServerState<S, L> {
    pub(crate) config: ServerConfig,
    pub(crate) sessions: Arc<SessionAuthority<S>>,
    pub(crate) validator: SessionValidator<S>,
    pub(crate) lobbies: Arc<LobbyAuthority<L>>,
    pub(crate) games: Arc<Mutex<GameAuthority>>,
    pub(crate) lobby_groups: Mutex<GroupRegistry>,
    pub(crate) game_groups: Arc<Mutex<GroupRegistry>>,
    pub(crate) codec: JsonCodec,
}

impl<S, L> ServerState<S, L> {
    /// Encodes once for the whole group.
    fn frame<T: Serialize>(&self, msg: &T) -> Option<Arc<[u8]>> {
        match self.codec.encode(msg) {
            Ok(bytes) => Some(bytes.into()),
            Err(e) => {
                tracing::error!(error = %e, "failed to encode outbound message");
                None
            }
        }
    }

    /// Queues `msg` for every lobby-channel connection of `lobby_id`.
    pub(crate) async fn broadcast_lobby(&self, lobby_id: LobbyId, msg: &LobbyServerMessage) -> usize {
        match self.frame(msg) {
            Some(frame) => self.lobby_groups.lock().await.broadcast(lobby_id, &frame),
            None => 0,
        }
    }

    /// Queues `msg` for every game-channel connection of `lobby_id`.
    pub(crate) async fn broadcast_game(&self, lobby_id: LobbyId, msg: &GameServerMessage) -> usize {
        match self.frame(msg) {
            Some(frame) => self.game_groups.lock().await.broadcast(lobby_id, &frame),
            None => 0,
        }
    }

    /// Queues `msg` for `user_id`'s game-channel connections only.
    pub(crate) async fn send_game_to_user(
        &self,
        lobby_id: LobbyId,
        user_id: UserId,
        msg: &GameServerMessage,
    ) -> usize {
        match self.frame(msg) {
            Some(frame) => self
                .game_groups
                .lock()
                .await
                .send_to_user(lobby_id, user_id, &frame),
            None => 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for configuring and starting a Hostrelay server.
///
/// # Example
///
/// ```rust,no_run
/// use hostrelay::prelude::*;
///
/// # async fn start() -> Result<(), HostrelayError> {
/// let server = HostrelayServerBuilder::new()
///     .http_addr("0.0.0.0:8080")
///     .realtime_addr("0.0.0.0:8081")
///     .build(InMemoryStore::new(), InMemoryLobbyStore::new())
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct HostrelayServerBuilder {
    config: ServerConfig,
}

impl HostrelayServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::from_config(ServerConfig::default())
    }

    /// Starts from an existing config, e.g. one read by
    /// [`ServerConfig::from_env`].
    pub fn from_config(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Sets the address of the REST API.
    pub fn http_addr(mut self, addr: &str) -> Self {
        self.config.http_addr = addr.to_string();
        self
    }

    /// Sets the address of the WebSocket listener.
    pub fn realtime_addr(mut self, addr: &str) -> Self {
        self.config.realtime_addr = addr.to_string();
        self
    }

    /// Sets the session configuration.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.config.session = config;
        self
    }

    /// Whether the session cookie carries `Secure`.
    pub fn secure_cookies(mut self, secure: bool) -> Self {
        self.config.secure_cookies = secure;
        self
    }

    /// Binds both listeners and wires up the authorities over the given
    /// stores.
    pub async fn build<S: AccountStore, L: LobbyStore>(
        self,
        accounts: S,
        lobbies: L,
    ) -> Result<HostrelayServer<S, L>, HostrelayError> {
        let transport = WebSocketTransport::bind(&self.config.realtime_addr).await?;
        let http_listener = TcpListener::bind(&self.config.http_addr).await?;
        tracing::info!(addr = %self.config.http_addr, "HTTP API listening");

        let sessions = Arc::new(SessionAuthority::new(accounts, self.config.session.clone()));
        let state = Arc::new(ServerState {
            validator: SessionValidator::new(Arc::clone(&sessions)),
            sessions,
            lobbies: Arc::new(LobbyAuthority::new(lobbies)),
            games: Arc::new(Mutex::new(GameAuthority::new())),
            lobby_groups: Mutex::new(GroupRegistry::new()),
            game_groups: Arc::new(Mutex::new(GroupRegistry::new())),
            codec: JsonCodec,
            config: self.config,
        });

        Ok(HostrelayServer {
            transport,
            http_listener,
            state,
            shutdown: CancellationToken::new(),
        })
    }
}

impl Default for HostrelayServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// A bound Hostrelay server.
///
/// Call [`run()`](Self::run) to start serving. Cancel the token from
/// [`shutdown_token()`](Self::shutdown_token) to stop it.
pub struct HostrelayServer<S, L> {
    transport: WebSocketTransport,
    http_listener: TcpListener,
    state: Arc<ServerState<S, L>>,
    shutdown: CancellationToken,
}

impl<S: AccountStore, L: LobbyStore> HostrelayServer<S, L> {
    /// Creates a new builder.
    pub fn builder() -> HostrelayServerBuilder {
        HostrelayServerBuilder::new()
    }

    /// Returns the address the WebSocket listener is bound to.
    pub fn realtime_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// Returns the address the HTTP API is bound to.
    pub fn http_addr(&self) -> std::io::Result<SocketAddr> {
        self.http_listener.local_addr()
    }

    /// The token that stops every server loop when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn sessions(&self) -> Arc<SessionAuthority<S>> {
        Arc::clone(&self.state.sessions)
    }

    pub fn lobbies(&self) -> Arc<LobbyAuthority<L>> {
        Arc::clone(&self.state.lobbies)
    }

    pub fn games(&self) -> Arc<Mutex<GameAuthority>> {
        Arc::clone(&self.state.games)
    }

    /// The REST API as a plain router, for serving elsewhere or testing
    /// without a socket.
    pub fn router(&self) -> Router {
        crate::http::router(Arc::clone(&self.state))
    }

    /// Runs every server loop until the shutdown token is cancelled:
    ///
    /// - the realtime accept loop (this task)
    /// - the HTTP API, with graceful shutdown
    /// - the tick broadcaster
    /// - the expired-session sweeper
    pub async fn run(mut self) -> Result<(), HostrelayError> {
        tracing::info!("Hostrelay server running");

        let broadcaster = TickBroadcaster::new(
            Arc::clone(&self.state.games),
            Arc::clone(&self.state.game_groups),
        );
        let broadcaster_task = tokio::spawn(broadcaster.run(self.shutdown.clone()));
        let sweeper_task = tokio::spawn(sweep_sessions(
            Arc::clone(&self.state.sessions),
            self.shutdown.clone(),
        ));

        let router = crate::http::router(Arc::clone(&self.state));
        let http_listener = self.http_listener;
        let http_shutdown = self.shutdown.clone();
        let http_task = tokio::spawn(async move {
            axum::serve(http_listener, router)
                .with_graceful_shutdown(http_shutdown.cancelled_owned())
                .await
        });

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                accepted = self.transport.accept() => match accepted {
                    Ok(pending) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            let peer = pending.peer_addr();
                            let conn = match pending.upgrade().await {
                                Ok(conn) => conn,
                                Err(e) => {
                                    tracing::debug!(%peer, error = %e, "realtime upgrade failed");
                                    return;
                                }
                            };
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
            }
        }

        tracing::info!("Hostrelay server shutting down");
        let _ = broadcaster_task.await;
        let _ = sweeper_task.await;
        match http_task.await {
            Ok(result) => result?,
            Err(e) => tracing::error!(error = %e, "HTTP task panicked"),
        }
        Ok(())
    }
}

async fn sweep_sessions<S: AccountStore>(
    sessions: Arc<SessionAuthority<S>>,
    shutdown: CancellationToken,
) {
    let mut interval = tokio::time::interval(SESSION_SWEEP_INTERVAL);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = interval.tick() => {
                if let Err(e) = sessions.purge_expired().await {
                    tracing::warn!(error = %e, "session sweep failed");
                }
            }
        }
    }
}
