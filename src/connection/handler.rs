//! Connection Handler Module
//!
//! This module handles individual client connections to contextd.
//! Each client gets its own handler task that runs in a loop,
//! reading lines and sending responses.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. Client connects (TCP handshake)
//!        │
//!        ▼
//! 2. ConnectionHandler created, id assigned
//!        │
//!        ▼
//! 3. ┌──────────────────────────────┐
//!    │      Main Loop               │
//!    │                              │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Read line (deadline)    │ │
//!    │  └───────────┬─────────────┘ │
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Parse message           │ │
//!    │  └───────────┬─────────────┘ │
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Dispatch                │ │
//!    │  └───────────┬─────────────┘ │
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Send response           │ │
//!    │  └───────────┬─────────────┘ │
//!    │              ▼               │
//!    │         [Loop back]          │
//!    └──────────────────────────────┘
//!        │
//!        ▼
//! 4. Read/write error, timeout, EOF or close signal
//!        │
//!        ▼
//! 5. Connection closed (exactly once)
//! ```
//!
//! ## Buffer Management
//!
//! Incoming bytes accumulate in a `BytesMut` buffer until a `\n` shows up.
//! A line longer than the configured maximum closes the connection.
//!
//! ## Shared Half
//!
//! The socket is split. The read half stays with the handler task; the
//! write half lives in [`Connection`], which the server also holds so it can
//! broadcast and force the connection closed.

use crate::commands::CommandHandler;
use crate::config::ServerConfig;
use crate::protocol::types::MESSAGE_DELIMITER;
use crate::protocol::{parse_bytes, Message};
use bytes::BytesMut;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{watch, Mutex};
use tokio::time::timeout;
use tracing::{debug, info, info_span, trace, warn, Instrument};

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Process-wide sequence mixed into connection ids
static CONNECTION_SEQ: AtomicU64 = AtomicU64::new(0);

/// Builds a connection id from the remote address, the current time and a
/// process-wide sequence number. No two calls return the same id.
pub fn next_connection_id(addr: &SocketAddr) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let seq = CONNECTION_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{}-{}-{}", addr, nanos, seq)
}

/// Statistics for connection handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Connections refused because the server was full
    pub connections_rejected: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total messages parsed and dispatched
    pub messages_processed: AtomicU64,
    /// Total lines that failed to parse
    pub malformed_messages: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn connection_rejected(&self) {
        self.connections_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn message_processed(&self) {
        self.messages_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn malformed_message(&self) {
        self.malformed_messages.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written
            .fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// The shared side of a client connection.
///
/// Holds the write half of the socket and the close signal. Both the
/// handler task and the server keep an `Arc<Connection>`.
#[derive(Debug)]
pub struct Connection {
    /// Unique connection id, also the client id in the context store
    id: String,

    /// Client's address (for logging)
    addr: SocketAddr,

    /// Write half of the socket, serialized between responses and broadcasts
    writer: Mutex<BufWriter<OwnedWriteHalf>>,

    /// Deadline for a single write
    write_timeout: Duration,

    /// Set by the first `close()`
    closed: AtomicBool,

    /// Fired once when the connection closes
    close_tx: watch::Sender<bool>,

    /// Connection statistics (shared)
    stats: Arc<ConnectionStats>,
}

impl Connection {
    fn new(
        id: String,
        addr: SocketAddr,
        writer: OwnedWriteHalf,
        write_timeout: Duration,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        let (close_tx, _) = watch::channel(false);
        Self {
            id,
            addr,
            writer: Mutex::new(BufWriter::new(writer)),
            write_timeout,
            closed: AtomicBool::new(false),
            close_tx,
            stats,
        }
    }

    /// The connection id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The client's address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns true once the connection has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Returns a receiver that observes the close signal.
    pub fn subscribe_close(&self) -> watch::Receiver<bool> {
        self.close_tx.subscribe()
    }

    /// Sends a message to the client.
    pub async fn send(&self, message: &Message) -> Result<(), ConnectionError> {
        self.send_line(&message.to_line()).await
    }

    /// Writes one preformatted line (delimiter included) to the client.
    ///
    /// Any failure closes the connection before the error is returned.
    pub async fn send_line(&self, line: &[u8]) -> Result<(), ConnectionError> {
        if self.is_closed() {
            return Err(ConnectionError::Closed);
        }

        let result = {
            let mut writer = self.writer.lock().await;
            let write = async {
                writer.write_all(line).await?;
                writer.flush().await
            };
            match timeout(self.write_timeout, write).await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(ConnectionError::Write(e)),
                Err(_) => Err(ConnectionError::WriteTimeout(self.write_timeout)),
            }
        };

        match result {
            Ok(()) => {
                self.stats.bytes_written(line.len());
                trace!(id = %self.id, bytes = line.len(), "Sent response");
                Ok(())
            }
            Err(e) => {
                warn!(id = %self.id, error = %e, "Failed to send message");
                if let Err(close_err) = self.close().await {
                    debug!(id = %self.id, error = %close_err, "Error closing after failed send");
                }
                Err(e)
            }
        }
    }

    /// Closes the connection.
    ///
    /// Only the first call does anything: it fires the close signal, which
    /// stops the read loop, and shuts down the write half so the client sees
    /// EOF. Later calls return `Ok(())` immediately.
    pub async fn close(&self) -> Result<(), ConnectionError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        self.close_tx.send_replace(true);

        let mut writer = self.writer.lock().await;
        let result = match timeout(self.write_timeout, writer.shutdown()).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotConnected => Ok(()),
            Ok(Err(e)) => Err(ConnectionError::Io(e)),
            Err(_) => Err(ConnectionError::WriteTimeout(self.write_timeout)),
        };

        info!(id = %self.id, client = %self.addr, "Connection closed");
        result
    }
}

/// Handles a single client connection.
///
/// This struct owns the read half, the read buffer and the command
/// handler for one connected client.
pub struct ConnectionHandler {
    /// Shared side of the connection
    connection: Arc<Connection>,

    /// Read half of the socket
    reader: OwnedReadHalf,

    /// Buffer for incoming data
    buffer: BytesMut,

    /// The command handler (shared store inside)
    command_handler: CommandHandler,

    /// Idle-read deadline
    read_timeout: Duration,

    /// Maximum line length, delimiter included
    max_message_size: usize,

    /// Connection statistics (shared)
    stats: Arc<ConnectionStats>,
}

impl ConnectionHandler {
    /// Creates a new connection handler.
    ///
    /// # Arguments
    ///
    /// * `stream` - The TCP stream for this connection
    /// * `addr` - The client's socket address
    /// * `command_handler` - The command handler for executing messages
    /// * `stats` - Shared connection statistics
    /// * `config` - Timeouts and size limits
    pub fn new(
        stream: TcpStream,
        addr: SocketAddr,
        command_handler: CommandHandler,
        stats: Arc<ConnectionStats>,
        config: &ServerConfig,
    ) -> Self {
        stats.connection_opened();

        let id = next_connection_id(&addr);
        let (reader, writer) = stream.into_split();
        let connection = Arc::new(Connection::new(
            id,
            addr,
            writer,
            config.write_timeout,
            Arc::clone(&stats),
        ));

        Self {
            connection,
            reader,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            command_handler,
            read_timeout: config.read_timeout,
            max_message_size: config.max_message_size,
            stats,
        }
    }

    /// Returns the shared side of this connection.
    pub fn connection(&self) -> Arc<Connection> {
        Arc::clone(&self.connection)
    }

    /// Runs the main connection loop.
    ///
    /// Reads lines, dispatches them and sends back responses until the
    /// client disconnects, an I/O error or timeout occurs, or the connection
    /// is closed from outside. The connection is always closed on return.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        let addr = self.connection.addr();
        info!(client = %addr, "New connection established");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => debug!(client = %addr, "Connection loop stopped"),
            Err(e) => match e {
                ConnectionError::ClientDisconnected => {
                    debug!(client = %addr, "Client disconnected")
                }
                ConnectionError::Closed => debug!(client = %addr, "Connection closed by server"),
                ConnectionError::Io(io_err)
                    if io_err.kind() == std::io::ErrorKind::ConnectionReset =>
                {
                    debug!(client = %addr, "Connection reset by client")
                }
                _ => warn!(client = %addr, error = %e, "Connection error"),
            },
        }

        if let Err(e) = self.connection.close().await {
            debug!(client = %addr, error = %e, "Error while closing connection");
        }
        self.stats.connection_closed();
        result
    }

    /// The main read-dispatch-respond loop.
    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        let mut close_rx = self.connection.subscribe_close();
        let read_timeout = self.read_timeout;

        loop {
            if *close_rx.borrow() {
                return Ok(());
            }

            let line = tokio::select! {
                _ = close_rx.changed() => return Ok(()),
                read = timeout(read_timeout, self.read_line()) => match read {
                    Ok(line) => line?,
                    Err(_) => return Err(ConnectionError::ReadTimeout(read_timeout)),
                },
            };

            self.process_line(&line).await?;
        }
    }

    /// Parses and dispatches one line, then sends the response if there is one.
    async fn process_line(&mut self, line: &[u8]) -> Result<(), ConnectionError> {
        let response = match parse_bytes(line) {
            Ok(message) => {
                self.stats.message_processed();
                self.command_handler.execute(self.connection.id(), message)
            }
            Err(e) => {
                self.stats.malformed_message();
                self.command_handler.malformed(&e)
            }
        };

        if let Some(response) = response {
            self.connection.send(&response).await?;
        }
        Ok(())
    }

    /// Returns the next complete line from the socket, delimiter included.
    async fn read_line(&mut self) -> Result<BytesMut, ConnectionError> {
        loop {
            if let Some(pos) = self.buffer.iter().position(|b| *b == MESSAGE_DELIMITER) {
                if pos + 1 > self.max_message_size {
                    return Err(ConnectionError::MessageTooLarge {
                        size: pos + 1,
                        max: self.max_message_size,
                    });
                }
                let line = self.buffer.split_to(pos + 1);
                trace!(
                    id = %self.connection.id(),
                    len = line.len(),
                    remaining = self.buffer.len(),
                    "Read line"
                );
                return Ok(line);
            }

            if self.buffer.len() >= self.max_message_size {
                return Err(ConnectionError::MessageTooLarge {
                    size: self.buffer.len(),
                    max: self.max_message_size,
                });
            }

            // Ensure we have some capacity
            if self.buffer.capacity() - self.buffer.len() < 1024 {
                self.buffer.reserve(INITIAL_BUFFER_SIZE);
            }

            let n = self.reader.read_buf(&mut self.buffer).await?;

            if n == 0 {
                // Connection closed by client
                if self.buffer.is_empty() {
                    return Err(ConnectionError::ClientDisconnected);
                } else {
                    // Partial line in buffer
                    return Err(ConnectionError::UnexpectedEof);
                }
            }

            self.stats.bytes_read(n);
        }
    }
}

/// Errors that can occur while handling a connection.
///
/// Every variant ends the connection it came from and no other.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error while reading or closing
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No complete line arrived before the idle-read deadline
    #[error("read timed out after {0:?}")]
    ReadTimeout(Duration),

    /// Writing a response failed
    #[error("write failed: {0}")]
    Write(std::io::Error),

    /// Writing a response took longer than the write deadline
    #[error("write timed out after {0:?}")]
    WriteTimeout(Duration),

    /// Client disconnected normally
    #[error("Client disconnected")]
    ClientDisconnected,

    /// Unexpected end of stream (partial line)
    #[error("Unexpected end of stream")]
    UnexpectedEof,

    /// A line exceeded the size limit
    #[error("message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },

    /// The connection was already closed
    #[error("connection closed")]
    Closed,
}

/// Handles a client connection.
///
/// Runs the handler to completion inside a span carrying the connection id.
pub async fn handle_connection(handler: ConnectionHandler) {
    let connection = handler.connection();
    let span = info_span!("conn", id = %connection.id());

    async move {
        if let Err(e) = handler.run().await {
            match e {
                ConnectionError::ClientDisconnected | ConnectionError::Closed => {}
                ConnectionError::Io(ref io_err)
                    if io_err.kind() == std::io::ErrorKind::ConnectionReset => {}
                _ => {
                    debug!(client = %connection.addr(), error = %e, "Connection ended with error");
                }
            }
        }
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ContextStore;
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::net::TcpListener;

    struct TestServer {
        addr: SocketAddr,
        store: Arc<ContextStore>,
        stats: Arc<ConnectionStats>,
        connections: tokio::sync::mpsc::UnboundedReceiver<Arc<Connection>>,
    }

    async fn create_test_server(config: ServerConfig) -> TestServer {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let store = Arc::new(ContextStore::new());
        let stats = Arc::new(ConnectionStats::new());
        let (conn_tx, connections) = tokio::sync::mpsc::unbounded_channel();

        let store_clone = Arc::clone(&store);
        let stats_clone = Arc::clone(&stats);

        tokio::spawn(async move {
            while let Ok((stream, client_addr)) = listener.accept().await {
                let commands = CommandHandler::new(Arc::clone(&store_clone))
                    .with_error_replies(config.reply_errors);
                let handler = ConnectionHandler::new(
                    stream,
                    client_addr,
                    commands,
                    Arc::clone(&stats_clone),
                    &config,
                );
                let _ = conn_tx.send(handler.connection());
                tokio::spawn(handle_connection(handler));
            }
        });

        TestServer {
            addr,
            store,
            stats,
            connections,
        }
    }

    async fn connect(addr: SocketAddr) -> BufReader<TcpStream> {
        BufReader::new(TcpStream::connect(addr).await.unwrap())
    }

    async fn send(client: &mut BufReader<TcpStream>, line: &str) {
        client.get_mut().write_all(line.as_bytes()).await.unwrap();
    }

    async fn read_reply(client: &mut BufReader<TcpStream>) -> String {
        let mut line = String::new();
        tokio::time::timeout(Duration::from_secs(2), client.read_line(&mut line))
            .await
            .expect("timed out waiting for reply")
            .unwrap();
        line
    }

    async fn expect_eof(client: &mut BufReader<TcpStream>) {
        let mut line = String::new();
        let n = tokio::time::timeout(Duration::from_secs(2), client.read_line(&mut line))
            .await
            .expect("timed out waiting for EOF")
            .unwrap_or(0);
        assert_eq!(n, 0, "expected EOF, got {line:?}");
    }

    #[test]
    fn test_connection_ids_are_unique() {
        let addr: SocketAddr = "127.0.0.1:5000".parse().unwrap();
        let ids: std::collections::HashSet<String> =
            (0..1000).map(|_| next_connection_id(&addr)).collect();
        assert_eq!(ids.len(), 1000);
        assert!(ids.iter().all(|id| id.starts_with("127.0.0.1:5000-")));
    }

    #[tokio::test]
    async fn test_ping_pong() {
        let server = create_test_server(ServerConfig::default()).await;
        let mut client = connect(server.addr).await;

        send(&mut client, "PING:\n").await;
        let reply = read_reply(&mut client).await;

        let msg = crate::protocol::parse(&reply).unwrap();
        assert_eq!(msg.kind(), "PONG");
        assert!(msg.param("time").unwrap().parse::<u64>().is_ok());
    }

    #[tokio::test]
    async fn test_context_update() {
        let server = create_test_server(ServerConfig::default()).await;
        let mut client = connect(server.addr).await;

        send(&mut client, "CONTEXT:name=alice;room=42\n").await;
        assert_eq!(read_reply(&mut client).await, "ACK:status=ok\n");

        let clients = server.store.list_clients();
        assert_eq!(clients.len(), 1);
        let all = server.store.get_all(&clients[0]).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all["name"], "alice");
        assert_eq!(all["room"], "42");
    }

    #[tokio::test]
    async fn test_context_keyed_by_connection_id() {
        let mut server = create_test_server(ServerConfig::default()).await;
        let mut client = connect(server.addr).await;

        send(&mut client, "CONTEXT:name=alice\n").await;
        read_reply(&mut client).await;

        let connection = server.connections.recv().await.unwrap();
        assert_eq!(
            server.store.get(connection.id(), "name"),
            Some("alice".to_string())
        );
    }

    #[tokio::test]
    async fn test_garbage_keeps_connection_open() {
        let server = create_test_server(ServerConfig::default()).await;
        let mut client = connect(server.addr).await;

        send(&mut client, "GARBAGE\nTYPE:key\n\nPING:\n").await;
        let reply = read_reply(&mut client).await;
        assert!(reply.starts_with("PONG:time="), "got {reply:?}");

        assert_eq!(server.stats.malformed_messages.load(Ordering::Relaxed), 3);
    }

    #[tokio::test]
    async fn test_unknown_type_gets_no_reply() {
        let server = create_test_server(ServerConfig::default()).await;
        let mut client = connect(server.addr).await;

        // The PONG proves nothing was sent for HELLO
        send(&mut client, "HELLO:\nPING:\n").await;
        let reply = read_reply(&mut client).await;
        assert!(reply.starts_with("PONG:"), "got {reply:?}");
    }

    #[tokio::test]
    async fn test_error_replies() {
        let config = ServerConfig {
            reply_errors: true,
            ..Default::default()
        };
        let server = create_test_server(config).await;
        let mut client = connect(server.addr).await;

        send(&mut client, "GARBAGE\n").await;
        assert_eq!(read_reply(&mut client).await, "ERROR:reason=malformed\n");

        send(&mut client, "HELLO:\n").await;
        assert_eq!(
            read_reply(&mut client).await,
            "ERROR:reason=unknown_type;type=HELLO\n"
        );
    }

    #[tokio::test]
    async fn test_pipelined_lines() {
        let server = create_test_server(ServerConfig::default()).await;
        let mut client = connect(server.addr).await;

        send(&mut client, "CONTEXT:a=1\nCONTEXT:b=2\nPING:\n").await;
        assert_eq!(read_reply(&mut client).await, "ACK:status=ok\n");
        assert_eq!(read_reply(&mut client).await, "ACK:status=ok\n");
        assert!(read_reply(&mut client).await.starts_with("PONG:"));
    }

    #[tokio::test]
    async fn test_line_split_across_writes() {
        let server = create_test_server(ServerConfig::default()).await;
        let mut client = connect(server.addr).await;

        send(&mut client, "CONTEXT:na").await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        send(&mut client, "me=alice\n").await;
        assert_eq!(read_reply(&mut client).await, "ACK:status=ok\n");
    }

    #[tokio::test]
    async fn test_read_timeout_closes_connection() {
        let config = ServerConfig {
            read_timeout: Duration::from_millis(100),
            ..Default::default()
        };
        let server = create_test_server(config).await;
        let mut client = connect(server.addr).await;

        expect_eof(&mut client).await;

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(server.stats.active_connections.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_oversized_line_closes_connection() {
        let config = ServerConfig {
            max_message_size: 64,
            ..Default::default()
        };
        let server = create_test_server(config).await;
        let mut client = connect(server.addr).await;

        let long = format!("CONTEXT:k={}\n", "x".repeat(200));
        send(&mut client, &long).await;
        expect_eof(&mut client).await;
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let mut server = create_test_server(ServerConfig::default()).await;
        let mut client = connect(server.addr).await;

        let connection = server.connections.recv().await.unwrap();
        assert!(!connection.is_closed());

        let (a, b) = tokio::join!(connection.close(), connection.close());
        assert!(a.is_ok());
        assert!(b.is_ok());
        assert!(connection.is_closed());

        expect_eof(&mut client).await;

        let result = connection.send(&Message::ack("ok")).await;
        assert!(matches!(result, Err(ConnectionError::Closed)));
    }

    #[tokio::test]
    async fn test_context_survives_disconnect() {
        let server = create_test_server(ServerConfig::default()).await;
        let mut client = connect(server.addr).await;

        send(&mut client, "CONTEXT:name=alice\n").await;
        read_reply(&mut client).await;
        drop(client);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(server.stats.active_connections.load(Ordering::Relaxed), 0);

        let clients = server.store.list_clients();
        assert_eq!(clients.len(), 1);
        assert_eq!(
            server.store.get(&clients[0], "name"),
            Some("alice".to_string())
        );
    }

    #[tokio::test]
    async fn test_connection_stats() {
        let server = create_test_server(ServerConfig::default()).await;
        let stats = &server.stats;

        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);

        let mut client = connect(server.addr).await;

        // Give the server time to accept the connection
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(stats.connections_accepted.load(Ordering::Relaxed), 1);
        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 1);

        send(&mut client, "PING:\n").await;
        read_reply(&mut client).await;

        assert!(stats.messages_processed.load(Ordering::Relaxed) >= 1);
        assert!(stats.bytes_read.load(Ordering::Relaxed) > 0);
        assert!(stats.bytes_written.load(Ordering::Relaxed) > 0);

        drop(client);

        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);
    }
}
