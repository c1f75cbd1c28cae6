//! Command Handler Module
//!
//! Dispatches parsed messages on behalf of one client and produces the
//! response to send back, if any.
//!
//! ## Dispatched Messages
//!
//! - `PING` - Replies `PONG:time=<unix seconds>`
//! - `CONTEXT:k=v;...` - Stores every pair in the client's context, replies `ACK:status=ok`
//!
//! `PONG`, `ACK` and `ERROR` are valid message types but are never sent by a
//! well-behaved client, so they are not dispatched. Like unknown types they
//! are logged and ignored, unless error replies are enabled.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     CommandHandler                          │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐      │
//! │  │  Message    │───>│  dispatch() │───>│  Response?  │      │
//! │  └─────────────┘    └──────┬──────┘    └─────────────┘      │
//! │                            │                                │
//! │                            ▼                                │
//! │                      ContextStore                           │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use crate::protocol::types::{KEY_VALUE_SEPARATOR, PAIR_SEPARATOR};
use crate::protocol::{Message, MessageType, ParseError};
use crate::storage::ContextStore;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// Status reported in `ACK` replies to context updates
pub const STATUS_OK: &str = "ok";

/// Handles protocol messages by dispatching them against the context store.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    /// The shared context store
    store: Arc<ContextStore>,
    /// Reply with `ERROR` instead of staying silent
    reply_errors: bool,
}

impl CommandHandler {
    /// Creates a new command handler with the given store.
    pub fn new(store: Arc<ContextStore>) -> Self {
        Self {
            store,
            reply_errors: false,
        }
    }

    /// Enables or disables `ERROR` replies for malformed and unknown messages.
    pub fn with_error_replies(mut self, enabled: bool) -> Self {
        self.reply_errors = enabled;
        self
    }

    /// Returns the shared store.
    pub fn store(&self) -> &Arc<ContextStore> {
        &self.store
    }

    /// Executes a message for `client_id` and returns the response to send.
    ///
    /// # Returns
    ///
    /// `None` when the message gets no reply.
    pub fn execute(&self, client_id: &str, message: Message) -> Option<Message> {
        debug!(kind = message.kind(), params = ?message.params(), "Received message");

        match message.message_type() {
            Some(MessageType::Ping) => Some(self.cmd_ping()),
            Some(MessageType::Context) => Some(self.cmd_context(client_id, message)),
            _ => {
                warn!(kind = message.kind(), "Unhandled message type");
                self.reply_errors
                    .then(|| Self::unknown_type_error(message.kind()))
            }
        }
    }

    /// Returns the response to a line that failed to parse.
    pub fn malformed(&self, err: &ParseError) -> Option<Message> {
        warn!(error = %err, "Malformed message");
        self.reply_errors.then(|| Message::error("malformed"))
    }

    /// `ERROR:reason=unknown_type;type=<tag>`. The tag is left out when it
    /// contains a separator, since the reply would not parse.
    fn unknown_type_error(kind: &str) -> Message {
        let mut params = vec![("reason", "unknown_type")];
        if !kind.contains([PAIR_SEPARATOR, KEY_VALUE_SEPARATOR]) {
            params.push(("type", kind));
        }
        Message::new(MessageType::Error.as_str(), params)
    }

    /// PING
    fn cmd_ping(&self) -> Message {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Message::pong(now)
    }

    /// CONTEXT key=value [;key=value ...]
    fn cmd_context(&self, client_id: &str, message: Message) -> Message {
        let params = message.into_params();
        if !params.is_empty() {
            debug!(count = params.len(), "Updating client context");
            self.store.set_multiple(client_id, params);
        }
        Message::ack(STATUS_OK)
    }
}
