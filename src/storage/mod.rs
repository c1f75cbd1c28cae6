//! Storage Module
//!
//! This module provides the context store shared by every client connection.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      ContextStore                           │
//! │                  RwLock<HashMap<id, ..>>                    │
//! │  ┌─────────────┐ ┌─────────────┐ ┌─────────────┐            │
//! │  │ client A    │ │ client B    │ │ client C    │   ...      │
//! │  │ name=alice  │ │ name=bob    │ │ room=42     │            │
//! │  └─────────────┘ └─────────────┘ └─────────────┘            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Contexts are created on the first write for a client and live until they
//! are cleared or the process exits.
//!
//! ## Example
//!
//! ```
//! use contextd::storage::ContextStore;
//! use std::sync::Arc;
//!
//! let store = Arc::new(ContextStore::new());
//! store.set_multiple("client-1", [("name", "alice"), ("room", "42")]);
//!
//! let matches = store.query_clients("room", "42");
//! assert_eq!(matches, vec!["client-1".to_string()]);
//! ```

pub mod context_store;

pub use context_store::{ClientContext, ContextStore};
