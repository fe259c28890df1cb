//! `RaidServer` builder and server loop.
//!
//! This is the entry point for running a raid server. It ties together
//! all the layers: transport → protocol → session → coordinator, plus
//! the optional HTTP listener for `GET /rooms`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use raidforge_protocol::JsonCodec;
use raidforge_session::{SessionManager, SessionStore};
use raidforge_store::KvStore;
use raidforge_transport::{Transport, WebSocketTransport};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use crate::RaidError;
use crate::catalog::UserCatalog;
use crate::config::{CoordinatorConfig, ServerConfig};
use crate::coordinator::RaidCoordinator;
use crate::handler::handle_connection;
use crate::http::{self, HttpState};
use crate::reward::LedgerService;

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<S, U, L, A> {
    pub(crate) sessions: Mutex<SessionManager>,
    pub(crate) session_store: Arc<A>,
    pub(crate) coordinator: RaidCoordinator<S, U, L>,
    pub(crate) codec: JsonCodec,
    pub(crate) idle_timeout: Option<Duration>,
}

/// Builder for configuring and starting a raid server.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
///
/// use raidforge::{MemoryCatalog, MemoryLedger, RaidServer};
/// use raidforge_session::{MemorySessionStore, SessionConfig};
/// use raidforge_store::MemoryStore;
///
/// # async fn run() -> Result<(), raidforge::RaidError> {
/// let server = RaidServer::<MemoryStore, MemoryCatalog, MemoryLedger, MemorySessionStore>::builder()
///     .bind("0.0.0.0:8080")
///     .http(Some("0.0.0.0:8081"))
///     .build(
///         MemoryStore::new(),
///         MemoryCatalog::new(),
///         Arc::new(MemoryLedger::new()),
///         Arc::new(MemorySessionStore::new(SessionConfig::default())),
///     )
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct RaidServerBuilder {
    bind_addr: String,
    http_addr: Option<String>,
    idle_timeout: Option<Duration>,
    coordinator: CoordinatorConfig,
}

impl RaidServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::from_config(&ServerConfig::default())
    }

    /// Starts from a loaded [`ServerConfig`].
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            bind_addr: config.ws_addr.clone(),
            http_addr: config.http_addr.clone(),
            idle_timeout: config.idle_timeout,
            coordinator: config.coordinator.clone(),
        }
    }

    /// Sets the WebSocket listen address.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the HTTP listen address; `None` disables the HTTP listener.
    pub fn http(mut self, addr: Option<&str>) -> Self {
        self.http_addr = addr.map(str::to_string);
        self
    }

    /// Drops connections that neither send nor receive anything for
    /// `timeout`. Off unless set.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    pub fn coordinator_config(mut self, config: CoordinatorConfig) -> Self {
        self.coordinator = config;
        self
    }

    /// Binds the listeners and wires the collaborators together.
    pub async fn build<S, U, L, A>(
        self,
        store: S,
        catalog: U,
        ledger: Arc<L>,
        sessions: Arc<A>,
    ) -> Result<RaidServer<S, U, L, A>, RaidError>
    where
        S: KvStore + Clone,
        U: UserCatalog,
        L: LedgerService,
        A: SessionStore,
    {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;
        let http = match &self.http_addr {
            Some(addr) => Some(TcpListener::bind(addr).await?),
            None => None,
        };

        let coordinator =
            RaidCoordinator::new(store, catalog, ledger, self.coordinator);
        let state = Arc::new(ServerState {
            sessions: Mutex::new(SessionManager::new()),
            session_store: sessions,
            coordinator,
            codec: JsonCodec,
            idle_timeout: self.idle_timeout,
        });

        Ok(RaidServer {
            transport,
            http,
            state,
        })
    }
}

impl Default for RaidServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound raid server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct RaidServer<S, U, L, A> {
    transport: WebSocketTransport,
    http: Option<TcpListener>,
    state: Arc<ServerState<S, U, L, A>>,
}

impl<S, U, L, A> RaidServer<S, U, L, A>
where
    S: KvStore + Clone,
    U: UserCatalog,
    L: LedgerService,
    A: SessionStore,
{
    /// Creates a new builder.
    pub fn builder() -> RaidServerBuilder {
        RaidServerBuilder::new()
    }

    /// Returns the WebSocket address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// Returns the HTTP address, if the HTTP listener is enabled.
    pub fn http_addr(&self) -> Option<SocketAddr> {
        self.http.as_ref().and_then(|l| l.local_addr().ok())
    }

    /// The coordinator behind this server. Useful for inspection in tests.
    pub fn coordinator(&self) -> RaidCoordinator<S, U, L> {
        self.state.coordinator.clone()
    }

    /// Runs the server accept loop.
    ///
    /// Spawns the HTTP listener (if any), then accepts WebSocket
    /// connections and spawns a handler task for each. Runs until the
    /// process is terminated.
    pub async fn run(mut self) -> Result<(), RaidError> {
        if let Some(listener) = self.http.take() {
            let app = http::router(HttpState {
                coordinator: self.state.coordinator.clone(),
                sessions: Arc::clone(&self.state.session_store),
            });
            tokio::spawn(async move {
                if let Err(e) = axum::serve(listener, app).await {
                    tracing::error!(error = %e, "http listener stopped");
                }
            });
        }

        tracing::info!(addr = ?self.local_addr().ok(), "raid server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
