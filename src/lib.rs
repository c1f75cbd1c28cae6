//! # contextd - A Line-Oriented Context Server
//!
//! contextd is a small TCP server that keeps a key-value context for every
//! connected client. Clients speak a newline-delimited text protocol:
//!
//! ```text
//! PING:                        ->  PONG:time=1700000000
//! CONTEXT:name=alice;room=42   ->  ACK:status=ok
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              contextd                                   │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │   Server    │───>│ Connection  │───>│  Command    │                  │
//! │  │ (Listener)  │    │  Handler    │    │  Handler    │                  │
//! │  └──────┬──────┘    └──────┬──────┘    └──────┬──────┘                  │
//! │         │                  │                  │                         │
//! │         │ connection       │ parse/format     ▼                         │
//! │         │ table            ▼           ┌──────────────┐                 │
//! │         │           ┌─────────────┐    │ ContextStore │                 │
//! │         └──────────>│  Protocol   │    │   RwLock     │                 │
//! │       broadcast     │   Codec     │    └──────────────┘                 │
//! │                     └─────────────┘                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use contextd::{ContextStore, Server, ServerConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = Arc::new(ContextStore::new());
//!     let server = Server::new(ServerConfig::default(), store);
//!
//!     server.start().await?;
//!     tokio::signal::ctrl_c().await?;
//!     server.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`protocol`]: Message type, parser and formatter
//! - [`storage`]: Thread-safe per-client context store
//! - [`commands`]: Message dispatch
//! - [`connection`]: Client connection management
//! - [`server`]: Listener, connection table, broadcast and shutdown
//! - [`config`]: Server configuration and CLI arguments
//!
//! ## Design Highlights
//!
//! ### Contexts Outlive Connections
//!
//! A client's context is keyed by its connection id and stays in the store
//! after the connection closes.
//!
//! ### Fail Closed
//!
//! Any read error, write error or idle timeout closes that connection and
//! only that connection. Malformed lines are skipped without closing.

pub mod commands;
pub mod config;
pub mod connection;
pub mod protocol;
pub mod server;
pub mod storage;

// Re-export commonly used types for convenience
pub use commands::CommandHandler;
pub use config::{CliArgs, ConfigError, ServerConfig, DEFAULT_HOST, DEFAULT_PORT};
pub use connection::{handle_connection, Connection, ConnectionError, ConnectionStats};
pub use protocol::{parse, Message, MessageType, ParseError};
pub use server::{Server, ServerError};
pub use storage::{ClientContext, ContextStore};

/// Version of contextd
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
