//! Thread-Safe Client Context Store
//!
//! This module implements the per-client key-value store shared by every
//! connection.
//!
//! ## Design Decisions
//!
//! 1. **One Lock**: A single `RwLock` guards the client map. Each operation is
//!    a map lookup plus a small mutation, so contention stays low.
//! 2. **Readers Share**: `get`, `get_all`, `list_clients` and `query_clients`
//!    take the read lock; everything else takes the write lock.
//! 3. **Batches Are Atomic**: `set_multiple` holds the write lock for the
//!    whole batch, so no reader ever observes half of it.
//! 4. **Absence Is Not An Error**: nothing here can fail. A missing client or
//!    key is reported as `None`.
//!
//! Contexts are keyed by client id and are never tied to a live connection:
//! they stay in the store after the connection that wrote them goes away.

use parking_lot::RwLock;
use std::collections::HashMap;

/// The key-value context of a single client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientContext {
    /// The context values
    pub values: HashMap<String, String>,
}

impl ClientContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }
}

/// The context store.
///
/// # Thread Safety
///
/// Designed to be wrapped in an `Arc` and shared across all connection
/// tasks. Every operation is thread-safe.
///
/// # Example
///
/// ```
/// use contextd::storage::ContextStore;
///
/// let store = ContextStore::new();
/// store.set("client-1", "name", "alice");
/// assert_eq!(store.get("client-1", "name"), Some("alice".to_string()));
///
/// store.clear("client-1");
/// assert_eq!(store.get("client-1", "name"), None);
/// ```
#[derive(Debug, Default)]
pub struct ContextStore {
    contexts: RwLock<HashMap<String, ClientContext>>,
}

impl ContextStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a single context value for a client.
    pub fn get(&self, client_id: &str, key: &str) -> Option<String> {
        let contexts = self.contexts.read();
        contexts
            .get(client_id)
            .and_then(|ctx| ctx.values.get(key))
            .cloned()
    }

    /// Returns a copy of every context value for a client.
    ///
    /// The returned map is independent of the store.
    pub fn get_all(&self, client_id: &str) -> Option<HashMap<String, String>> {
        let contexts = self.contexts.read();
        contexts.get(client_id).map(|ctx| ctx.values.clone())
    }

    /// Sets a context value, creating the client's context if needed.
    pub fn set(&self, client_id: &str, key: impl Into<String>, value: impl Into<String>) {
        let mut contexts = self.contexts.write();
        contexts
            .entry(client_id.to_string())
            .or_default()
            .values
            .insert(key.into(), value.into());
    }

    /// Sets several context values as one update.
    pub fn set_multiple<I, K, V>(&self, client_id: &str, values: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut contexts = self.contexts.write();
        let ctx = contexts.entry(client_id.to_string()).or_default();
        for (key, value) in values {
            ctx.values.insert(key.into(), value.into());
        }
    }

    /// Removes one context value. Does nothing if the client or key is absent.
    pub fn remove(&self, client_id: &str, key: &str) {
        let mut contexts = self.contexts.write();
        if let Some(ctx) = contexts.get_mut(client_id) {
            ctx.values.remove(key);
        }
    }

    /// Drops the client's whole context. Does nothing if absent.
    pub fn clear(&self, client_id: &str) {
        self.contexts.write().remove(client_id);
    }

    /// Returns the ids of every client that has a context, in no particular order.
    pub fn list_clients(&self) -> Vec<String> {
        self.contexts.read().keys().cloned().collect()
    }

    /// Returns every client whose context has `key` set to exactly `value`.
    ///
    /// This is a linear scan over all clients.
    pub fn query_clients(&self, key: &str, value: &str) -> Vec<String> {
        let contexts = self.contexts.read();
        contexts
            .iter()
            .filter(|(_, ctx)| ctx.values.get(key).is_some_and(|v| v == value))
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Number of clients with a context.
    pub fn len(&self) -> usize {
        self.contexts.read().len()
    }

    /// Returns true if no client has a context.
    pub fn is_empty(&self) -> bool {
        self.contexts.read().is_empty()
    }
}
