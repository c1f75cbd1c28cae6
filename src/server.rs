//! TCP server for contextd.
//!
//! Owns the listening socket and the table of live connections.
//!
//! - [`Server::start`] binds and spawns the accept loop, then returns.
//! - The accept loop registers every accepted socket and spawns its handler.
//!   Sockets beyond `max_connections` are dropped on the spot.
//! - [`Server::broadcast_message`] writes one formatted line to every live
//!   connection.
//! - [`Server::shutdown`] stops the accept loop (closing the listener), then
//!   closes every registered connection.

use crate::commands::CommandHandler;
use crate::config::ServerConfig;
use crate::connection::{handle_connection, Connection, ConnectionHandler, ConnectionStats};
use crate::protocol::Message;
use crate::storage::ContextStore;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

/// Pause after a failed accept before trying again
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Server errors
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to listen on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server already started")]
    AlreadyStarted,

    #[error("server has been shut down")]
    Stopped,

    #[error("error stopping listener: {0}")]
    Shutdown(String),
}

/// State shared between the server handle, the accept loop and the
/// connection tasks.
struct Shared {
    config: ServerConfig,
    store: Arc<ContextStore>,
    stats: Arc<ConnectionStats>,
    connections: RwLock<HashMap<String, Arc<Connection>>>,
}

impl Shared {
    /// Registers an accepted socket and spawns its handler, unless the
    /// server is full.
    fn spawn_connection(self: &Arc<Self>, stream: TcpStream, addr: SocketAddr) {
        let active = self.connections.read().len();
        if active >= self.config.max_connections {
            warn!(
                client = %addr,
                max = self.config.max_connections,
                "Connection limit reached, rejecting client"
            );
            self.stats.connection_rejected();
            return;
        }

        let commands = CommandHandler::new(Arc::clone(&self.store))
            .with_error_replies(self.config.reply_errors);
        let handler = ConnectionHandler::new(
            stream,
            addr,
            commands,
            Arc::clone(&self.stats),
            &self.config,
        );

        let connection = handler.connection();
        let id = connection.id().to_string();
        self.connections.write().insert(id.clone(), connection);

        let shared = Arc::clone(self);
        tokio::spawn(async move {
            handle_connection(handler).await;
            shared.connections.write().remove(&id);
        });
    }
}

/// The contextd server.
///
/// # Example
///
/// ```ignore
/// use contextd::{ContextStore, Server, ServerConfig};
/// use std::sync::Arc;
///
/// let store = Arc::new(ContextStore::new());
/// let server = Server::new(ServerConfig::default(), store);
///
/// let addr = server.start().await?;
/// // ... serve until asked to stop ...
/// server.shutdown().await?;
/// ```
pub struct Server {
    shared: Arc<Shared>,
    started: AtomicBool,
    shutdown_tx: watch::Sender<bool>,
    accept_task: Mutex<Option<JoinHandle<()>>>,
    local_addr: Mutex<Option<SocketAddr>>,
}

impl Server {
    /// Creates a server that will store client contexts in `store`.
    pub fn new(config: ServerConfig, store: Arc<ContextStore>) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            shared: Arc::new(Shared {
                config,
                store,
                stats: Arc::new(ConnectionStats::new()),
                connections: RwLock::new(HashMap::new()),
            }),
            started: AtomicBool::new(false),
            shutdown_tx,
            accept_task: Mutex::new(None),
            local_addr: Mutex::new(None),
        }
    }

    /// Binds the listening socket and starts accepting connections in the
    /// background.
    ///
    /// Returns as soon as the socket is bound, with the bound address.
    pub async fn start(&self) -> Result<SocketAddr, ServerError> {
        if *self.shutdown_tx.borrow() {
            return Err(ServerError::Stopped);
        }
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(ServerError::AlreadyStarted);
        }

        let bind_addr = self.shared.config.bind_address();
        let bound = match TcpListener::bind(&bind_addr).await {
            Ok(listener) => listener.local_addr().map(|addr| (listener, addr)),
            Err(e) => Err(e),
        };
        let (listener, addr) = match bound {
            Ok(bound) => bound,
            Err(source) => {
                self.started.store(false, Ordering::Release);
                return Err(ServerError::Bind {
                    addr: bind_addr,
                    source,
                });
            }
        };

        *self.local_addr.lock() = Some(addr);
        info!(addr = %addr, "Listening for connections");

        let shutdown_rx = self.shutdown_tx.subscribe();
        let task = tokio::spawn(accept_loop(listener, Arc::clone(&self.shared), shutdown_rx));
        *self.accept_task.lock() = Some(task);

        Ok(addr)
    }

    /// Stops the server.
    ///
    /// Stops the accept loop, which drops the listener, then closes every
    /// registered connection and empties the table. Errors closing
    /// individual connections are logged. Calling this more than once is a
    /// no-op.
    pub async fn shutdown(&self) -> Result<(), ServerError> {
        if self.shutdown_tx.send_replace(true) {
            debug!("Shutdown already requested");
            return Ok(());
        }
        info!("Shutting down server");

        let mut first_error = None;

        let task = self.accept_task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                error!(error = %e, "Accept loop did not stop cleanly");
                first_error = Some(ServerError::Shutdown(e.to_string()));
            }
        }

        let drained: Vec<(String, Arc<Connection>)> =
            self.shared.connections.write().drain().collect();

        let mut closing = JoinSet::new();
        for (id, connection) in drained {
            info!(id = %id, "Closing connection");
            closing.spawn(async move { (id, connection.close().await) });
        }
        while let Some(joined) = closing.join_next().await {
            match joined {
                Ok((_, Ok(()))) => {}
                Ok((id, Err(e))) => warn!(id = %id, error = %e, "Error closing connection"),
                Err(e) => warn!(error = %e, "Connection close task failed"),
            }
        }

        info!("Server shutdown complete");
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Sends `message` to every live connection.
    ///
    /// The message is formatted once and the same bytes go to every client.
    /// A failed delivery closes that connection only; delivery to the others
    /// continues. Returns the number of successful deliveries.
    pub async fn broadcast_message(&self, message: &Message) -> usize {
        let line = message.to_line();
        let targets: Vec<Arc<Connection>> =
            self.shared.connections.read().values().cloned().collect();

        let mut sends = JoinSet::new();
        for connection in targets {
            let line = line.clone();
            sends.spawn(async move {
                let result = connection.send_line(&line).await;
                (connection, result)
            });
        }

        let mut delivered = 0;
        while let Some(joined) = sends.join_next().await {
            match joined {
                Ok((_, Ok(()))) => delivered += 1,
                Ok((connection, Err(e))) => {
                    warn!(id = %connection.id(), error = %e, "Broadcast delivery failed")
                }
                Err(e) => warn!(error = %e, "Broadcast task failed"),
            }
        }

        debug!(kind = message.kind(), delivered, "Broadcast complete");
        delivered
    }

    /// The address the server is bound to, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock()
    }

    /// Number of registered connections.
    pub fn connection_count(&self) -> usize {
        self.shared.connections.read().len()
    }

    /// Ids of every registered connection.
    pub fn connection_ids(&self) -> Vec<String> {
        self.shared.connections.read().keys().cloned().collect()
    }

    /// The shared context store.
    pub fn store(&self) -> &Arc<ContextStore> {
        &self.shared.store
    }

    /// Connection statistics.
    pub fn stats(&self) -> &Arc<ConnectionStats> {
        &self.shared.stats
    }

    /// The server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.shared.config
    }
}

/// Accepts connections until shutdown is requested.
async fn accept_loop(
    listener: TcpListener,
    shared: Arc<Shared>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        let accepted = tokio::select! {
            _ = shutdown_rx.changed() => break,
            accepted = listener.accept() => accepted,
        };

        match accepted {
            Ok((stream, addr)) => shared.spawn_connection(stream, addr),
            Err(e) => {
                if *shutdown_rx.borrow() {
                    break;
                }
                error!(error = %e, "Error accepting connection");
                if backoff_or_shutdown(&mut shutdown_rx, ACCEPT_ERROR_BACKOFF).await {
                    break;
                }
            }
        }
    }

    debug!("Accept loop stopped");
}

/// Sleeps for `pause` unless shutdown is requested first. Returns true on
/// shutdown.
async fn backoff_or_shutdown(shutdown_rx: &mut watch::Receiver<bool>, pause: Duration) -> bool {
    tokio::select! {
        _ = shutdown_rx.changed() => true,
        _ = tokio::time::sleep(pause) => *shutdown_rx.borrow(),
    }
}
