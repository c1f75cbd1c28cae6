//! Command Handling Module
//!
//! This module turns parsed protocol messages into store updates and
//! responses. It knows nothing about sockets: the connection handler feeds it
//! one message at a time and writes back whatever it returns.
//!
//! ## Example
//!
//! ```
//! use contextd::commands::CommandHandler;
//! use contextd::protocol::parse;
//! use contextd::storage::ContextStore;
//! use std::sync::Arc;
//!
//! let store = Arc::new(ContextStore::new());
//! let handler = CommandHandler::new(Arc::clone(&store));
//!
//! let reply = handler.execute("client-1", parse("CONTEXT:name=alice").unwrap());
//! assert_eq!(reply.unwrap().format(), "ACK:status=ok");
//! assert_eq!(store.get("client-1", "name"), Some("alice".to_string()));
//! ```

pub mod handler;

pub use handler::{CommandHandler, STATUS_OK};
