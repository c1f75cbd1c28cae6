//! Context Protocol Implementation
//!
//! This module implements the newline-delimited text protocol spoken by
//! contextd clients.
//!
//! ## Overview
//!
//! Each message is one line: a type tag, a `:`, then zero or more
//! `key=value` pairs separated by `;`. The codec is stateless: parsing and
//! formatting are pure functions.
//!
//! ## Modules
//!
//! - `types`: Defines `Message`, `MessageType` and the separator constants
//! - `parser`: Parses lines into `Message`s
//!
//! ## Example
//!
//! ```
//! use contextd::protocol::{parse, Message};
//!
//! // Parsing incoming data
//! let msg = parse("CONTEXT:name=alice;room=42").unwrap();
//! assert_eq!(msg.param("name"), Some("alice"));
//!
//! // Creating responses
//! let response = Message::ack("ok");
//! assert_eq!(response.format(), "ACK:status=ok");
//! ```

pub mod parser;
pub mod types;

// Re-export commonly used types for convenience
pub use parser::{parse, parse_bytes, ParseError, ParseResult};
pub use types::{is_valid_message_type, Message, MessageType};
