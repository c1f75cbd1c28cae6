//! Configuration module for the contextd server.
//!
//! The port is the main knob. The remaining limits default to the values
//! the server has always used and can be overridden from the command line.

use clap::Parser;
use std::time::Duration;
use thiserror::Error;

/// The default port contextd listens on
pub const DEFAULT_PORT: u16 = 8080;

/// The default host contextd binds to (all interfaces)
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Maximum number of simultaneous connections
pub const DEFAULT_MAX_CONNECTIONS: usize = 1000;

/// Idle-read deadline in seconds
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 60;

/// Write deadline in seconds
pub const DEFAULT_WRITE_TIMEOUT_SECS: u64 = 10;

/// Maximum length of a single message line in bytes
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 4096;

/// Command-line arguments for the server
#[derive(Parser, Debug)]
#[command(name = "contextd")]
#[command(version)]
#[command(about = "A line-oriented TCP server that keeps a key-value context per client", long_about = None)]
pub struct CliArgs {
    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Address to bind to
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,

    /// Maximum number of simultaneous connections
    #[arg(long, default_value_t = DEFAULT_MAX_CONNECTIONS)]
    pub max_connections: usize,

    /// Seconds a connection may stay silent before it is closed
    #[arg(long, default_value_t = DEFAULT_READ_TIMEOUT_SECS)]
    pub read_timeout: u64,

    /// Seconds a single response write may take
    #[arg(long, default_value_t = DEFAULT_WRITE_TIMEOUT_SECS)]
    pub write_timeout: u64,

    /// Maximum length of a message line in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_MESSAGE_SIZE)]
    pub max_message_size: usize,

    /// Reply with ERROR messages to malformed or unknown messages instead of ignoring them.
    /// The unknown tag is echoed in `type=`, unless it contains `;` or `=`
    #[arg(long)]
    pub reply_errors: bool,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// Resolved server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on (0 picks a free port)
    pub port: u16,
    /// Connections beyond this count are rejected at accept time
    pub max_connections: usize,
    /// Idle-read deadline
    pub read_timeout: Duration,
    /// Deadline for writing one response
    pub write_timeout: Duration,
    /// Maximum line length in bytes, delimiter included
    pub max_message_size: usize,
    /// Send `ERROR` replies to malformed or unknown messages
    pub reply_errors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            read_timeout: Duration::from_secs(DEFAULT_READ_TIMEOUT_SECS),
            write_timeout: Duration::from_secs(DEFAULT_WRITE_TIMEOUT_SECS),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            reply_errors: false,
        }
    }
}

impl ServerConfig {
    /// Returns the bind address as a string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Checks that every limit is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_connections == 0 {
            return Err(ConfigError::Invalid("max_connections must be at least 1"));
        }
        if self.read_timeout.is_zero() {
            return Err(ConfigError::Invalid("read_timeout must be non-zero"));
        }
        if self.write_timeout.is_zero() {
            return Err(ConfigError::Invalid("write_timeout must be non-zero"));
        }
        if self.max_message_size == 0 {
            return Err(ConfigError::Invalid("max_message_size must be non-zero"));
        }
        Ok(())
    }
}

impl TryFrom<&CliArgs> for ServerConfig {
    type Error = ConfigError;

    fn try_from(args: &CliArgs) -> Result<Self, Self::Error> {
        let config = Self {
            host: args.host.clone(),
            port: args.port,
            max_connections: args.max_connections,
            read_timeout: Duration::from_secs(args.read_timeout),
            write_timeout: Duration::from_secs(args.write_timeout),
            max_message_size: args.max_message_size,
            reply_errors: args.reply_errors,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
}
