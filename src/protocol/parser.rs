//! Context Protocol Parser
//!
//! Converts one line of text into a [`Message`].
//!
//! ## Parsing Rules
//!
//! 1. Surrounding whitespace (including the `\r\n` / `\n` delimiter) is trimmed.
//! 2. The line is split on the first `:` only. The type tag must be non-empty.
//! 3. An empty parameter section is legal and yields zero parameters.
//! 4. Otherwise the section is split on `;`, and each pair on its first `=`.
//!    Every pair needs an `=` and a non-empty key.
//! 5. Keys and values are trimmed; a repeated key keeps its last value.
//!
//! Unknown type tags are accepted here. Whether a tag means anything is
//! decided by the command handler, not the parser.

use crate::protocol::types::{Message, KEY_VALUE_SEPARATOR, PAIR_SEPARATOR, TYPE_SEPARATOR};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur while parsing a message.
///
/// Every variant describes a malformed message. They are recoverable:
/// the offending line is dropped and the session continues.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The line is empty after trimming
    #[error("empty message")]
    EmptyMessage,

    /// No `:` between the type and the parameters
    #[error("invalid message format: missing type separator")]
    MissingTypeSeparator,

    /// Nothing before the `:`
    #[error("missing message type")]
    MissingType,

    /// A parameter pair without `=`
    #[error("invalid parameter format: {0:?}")]
    InvalidParameter(String),

    /// A parameter pair with nothing before the `=`
    #[error("empty parameter key")]
    EmptyParameterKey,

    /// The line is not valid UTF-8
    #[error("invalid UTF-8: {0}")]
    InvalidUtf8(String),
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Parses a single line of text into a message.
///
/// # Example
///
/// ```
/// use contextd::protocol::parse;
///
/// let msg = parse("CONTEXT:name=alice;room=42\n").unwrap();
/// assert_eq!(msg.kind(), "CONTEXT");
/// assert_eq!(msg.param("room"), Some("42"));
/// ```
pub fn parse(raw: &str) -> ParseResult<Message> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ParseError::EmptyMessage);
    }

    let (kind, rest) = raw
        .split_once(TYPE_SEPARATOR)
        .ok_or(ParseError::MissingTypeSeparator)?;

    let kind = kind.trim();
    if kind.is_empty() {
        return Err(ParseError::MissingType);
    }

    let params = parse_params(rest)?;
    Ok(Message::from_parts(kind.to_string(), params))
}

/// Parses a raw line read from the network.
pub fn parse_bytes(buf: &[u8]) -> ParseResult<Message> {
    let line = std::str::from_utf8(buf).map_err(|e| ParseError::InvalidUtf8(e.to_string()))?;
    parse(line)
}

fn parse_params(section: &str) -> ParseResult<BTreeMap<String, String>> {
    let mut params = BTreeMap::new();
    if section.is_empty() {
        return Ok(params);
    }

    for pair in section.split(PAIR_SEPARATOR) {
        let (key, value) = pair
            .split_once(KEY_VALUE_SEPARATOR)
            .ok_or_else(|| ParseError::InvalidParameter(pair.to_string()))?;

        let key = key.trim();
        if key.is_empty() {
            return Err(ParseError::EmptyParameterKey);
        }

        params.insert(key.to_string(), value.trim().to_string());
    }

    Ok(params)
}
