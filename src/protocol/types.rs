//! Context Protocol Message Types
//!
//! This module defines the `Message` type exchanged over the wire and the
//! constants that shape its text form.
//!
//! ## Protocol Format
//!
//! Every message is a single UTF-8 line:
//!
//! ```text
//! TYPE:key1=value1;key2=value2\n
//! ```
//!
//! - `:` separates the type tag from the parameter section
//! - `;` separates parameter pairs
//! - `=` separates a key from its value
//! - `\n` terminates the message
//!
//! The parameter section may be empty (`PING:`).
//!
//! ## Examples
//!
//! Ping: `PING:`
//! Pong: `PONG:time=1700000000`
//! Context update: `CONTEXT:name=alice;room=42`
//! Acknowledgement: `ACK:status=ok`
//!
//! ## Limitations
//!
//! Values are not escaped. A key or value containing `;` or `=` cannot be
//! represented, and surrounding whitespace is trimmed on parse.

use bytes::Bytes;
use std::collections::BTreeMap;
use std::fmt;

/// Version of the line protocol spoken by this server
pub const PROTOCOL_VERSION: &str = "1.0";

/// Terminates every message on the wire
pub const MESSAGE_DELIMITER: u8 = b'\n';

/// Separates the message type from its parameters
pub const TYPE_SEPARATOR: char = ':';

/// Separates parameter pairs
pub const PAIR_SEPARATOR: char = ';';

/// Separates a parameter key from its value
pub const KEY_VALUE_SEPARATOR: char = '=';

/// Message type tags known to the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Liveness probe sent by clients
    Ping,
    /// Reply to `PING`, carries the server time
    Pong,
    /// Client context update
    Context,
    /// Acknowledgement of a context update
    Ack,
    /// Error report
    Error,
}

impl MessageType {
    /// All known message types.
    pub const ALL: [MessageType; 5] = [
        MessageType::Ping,
        MessageType::Pong,
        MessageType::Context,
        MessageType::Ack,
        MessageType::Error,
    ];

    /// Returns the wire tag for this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Ping => "PING",
            MessageType::Pong => "PONG",
            MessageType::Context => "CONTEXT",
            MessageType::Ack => "ACK",
            MessageType::Error => "ERROR",
        }
    }

    /// Looks up a message type by its wire tag (case-sensitive).
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == tag)
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns true if `tag` is one of the message types known to the protocol.
///
/// Unknown tags still parse; dispatch decides what to do with them.
pub fn is_valid_message_type(tag: &str) -> bool {
    MessageType::from_tag(tag).is_some()
}

/// A single protocol message: a type tag plus a set of parameters.
///
/// Parameters are kept in key order so that formatting is stable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    kind: String,
    params: BTreeMap<String, String>,
}

impl Message {
    /// Creates a message from a raw type tag and parameters.
    ///
    /// # Example
    /// ```
    /// use contextd::protocol::Message;
    /// let msg = Message::new("CONTEXT", [("name", "alice")]);
    /// assert_eq!(msg.format(), "CONTEXT:name=alice");
    /// ```
    pub fn new<K, V>(kind: impl Into<String>, params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            kind: kind.into(),
            params: params
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Creates a message with no parameters.
    pub fn empty(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            params: BTreeMap::new(),
        }
    }

    pub(crate) fn from_parts(kind: String, params: BTreeMap<String, String>) -> Self {
        Self { kind, params }
    }

    /// `PONG:time=<unix seconds>`
    pub fn pong(unix_secs: u64) -> Self {
        Self::new(MessageType::Pong.as_str(), [("time", unix_secs.to_string())])
    }

    /// `ACK:status=<status>`
    pub fn ack(status: impl Into<String>) -> Self {
        Self::new(MessageType::Ack.as_str(), [("status", status.into())])
    }

    /// `ERROR:reason=<reason>`
    pub fn error(reason: impl Into<String>) -> Self {
        Self::new(MessageType::Error.as_str(), [("reason", reason.into())])
    }

    /// The raw type tag.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The known message type, or `None` for an unrecognized tag.
    pub fn message_type(&self) -> Option<MessageType> {
        MessageType::from_tag(&self.kind)
    }

    /// All parameters, ordered by key.
    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    /// Looks up a single parameter.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Consumes the message and returns its parameters.
    pub fn into_params(self) -> BTreeMap<String, String> {
        self.params
    }

    /// Renders the message in wire form, without the trailing delimiter.
    ///
    /// Parsing the result gives back an equal message as long as no key or
    /// value contains a separator or has leading or trailing whitespace.
    pub fn format(&self) -> String {
        let mut out = String::with_capacity(self.kind.len() + 1 + self.params.len() * 16);
        self.format_into(&mut out);
        out
    }

    /// Renders the message into an existing buffer.
    pub fn format_into(&self, out: &mut String) {
        out.push_str(&self.kind);
        out.push(TYPE_SEPARATOR);
        for (i, (key, value)) in self.params.iter().enumerate() {
            if i > 0 {
                out.push(PAIR_SEPARATOR);
            }
            out.push_str(key);
            out.push(KEY_VALUE_SEPARATOR);
            out.push_str(value);
        }
    }

    /// Renders the message as a complete wire line, delimiter included.
    pub fn to_line(&self) -> Bytes {
        let mut out = self.format();
        out.push(MESSAGE_DELIMITER as char);
        Bytes::from(out)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?}", self.kind, self.params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_no_params() {
        assert_eq!(Message::empty("PING").format(), "PING:");
    }

    #[test]
    fn test_format_sorted_params() {
        let msg = Message::new("CONTEXT", [("room", "42"), ("name", "alice")]);
        assert_eq!(msg.format(), "CONTEXT:name=alice;room=42");
    }

    #[test]
    fn test_to_line_appends_delimiter() {
        let msg = Message::ack("ok");
        assert_eq!(&msg.to_line()[..], b"ACK:status=ok\n");
    }

    #[test]
    fn test_pong_carries_time() {
        let msg = Message::pong(1_700_000_000);
        assert_eq!(msg.message_type(), Some(MessageType::Pong));
        assert_eq!(msg.param("time"), Some("1700000000"));
    }

    #[test]
    fn test_valid_message_types() {
        for tag in ["PING", "PONG", "CONTEXT", "ACK", "ERROR"] {
            assert!(is_valid_message_type(tag), "{tag} should be valid");
        }
        assert!(!is_valid_message_type("ping"));
        assert!(!is_valid_message_type("GARBAGE"));
        assert!(!is_valid_message_type(""));
    }

    #[test]
    fn test_unknown_kind_has_no_type() {
        let msg = Message::empty("HELLO");
        assert_eq!(msg.kind(), "HELLO");
        assert_eq!(msg.message_type(), None);
    }
}
