//! Error types for the EchoRS client
//!
//! Transport faults, protocol violations and server-reported failures are
//! kept apart so callers can tell a broken connection from a malformed reply
//! from a command the server refused.

use thiserror::Error;

use crate::protocol::ValueType;

/// Result type alias using EchoError
pub type Result<T> = std::result::Result<T, EchoError>;

/// Unified error type for EchoRS client operations
#[derive(Debug, Error)]
pub enum EchoError {
    // -------------------------------------------------------------------------
    // Transport Errors
    // -------------------------------------------------------------------------
    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("Connection closed by server")]
    ConnectionClosed,

    /// An earlier exchange failed part-way; the stream may hold a stale reply
    #[error("Connection unusable after an earlier failed exchange")]
    Poisoned,

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    // -------------------------------------------------------------------------
    // Application Errors
    // -------------------------------------------------------------------------
    /// The server answered with `Status::Error`
    #[error("Server error: {0}")]
    Application(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Violations of the wire format
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProtocolError {
    #[error("unrecognized status byte: 0x{0:02x}")]
    UnknownStatus(u8),

    #[error("unrecognized value type: 0x{0:02x}")]
    UnknownValueType(u8),

    #[error("unsupported value type: {0:?}")]
    UnsupportedValueType(ValueType),

    #[error("list element has type tag 0x{0:02x}, expected STRING")]
    UnexpectedListElement(u8),

    #[error("truncated value: {context} needs {needed} bytes, {remaining} remaining")]
    Truncated {
        context: &'static str,
        needed: usize,
        remaining: usize,
    },

    /// The command payload does not fit the u32 frame length
    #[error("request of {len} bytes exceeds the u32 frame length")]
    RequestTooLarge { len: usize },

    /// The response filled the whole read buffer, so its tail may be missing
    #[error("truncated response: filled the {limit}-byte read buffer")]
    ResponseOverflow { limit: usize },
}

impl EchoError {
    /// True when the error came from the socket rather than the payload
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            EchoError::Transport(_) | EchoError::ConnectionClosed | EchoError::Poisoned
        )
    }
}
