//! Connection Handler Module
//!
//! This module manages individual client connections to contextd.
//! Each client connection is handled by its own async task.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Server accept loop                      │
//! └──────────────────────┬──────────────────────────────────────┘
//!                        │
//!                        │ accept() + spawn task
//!                        ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 ConnectionHandler                           │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐      │
//! │  │ Read line   │───>│ Parse msg   │───>│ Execute cmd │      │
//! │  └─────────────┘    └─────────────┘    └─────────────┘      │
//! │                                               │             │
//! │                                               ▼             │
//! │  ┌───────────────────────────┐       ┌─────────────┐        │
//! │  │ Connection (shared)       │<──────│ Send resp   │        │
//! │  │ write half + close signal │       └─────────────┘        │
//! │  └───────────────────────────┘                              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **Idle Deadline**: A silent connection is closed after the read timeout
//! - **Fail Closed**: Any read or write failure closes the connection
//! - **Tolerant Parsing**: Malformed lines are logged and skipped
//! - **Statistics**: Tracks connection and message metrics

pub mod handler;

// Re-export commonly used types
pub use handler::{
    handle_connection, next_connection_id, Connection, ConnectionError, ConnectionHandler,
    ConnectionStats,
};
