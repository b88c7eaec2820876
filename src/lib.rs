//! # EchoRS Client
//!
//! A blocking client for the EchoRS key-value server with:
//! - Scalar values (string, integer, float)
//! - Integer and float counters
//! - Ordered string lists
//! - HyperLogLog cardinality estimators
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Client / SharedClient                       │
//! │               (named operations, one at a time)              │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ Command
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      Protocol                                │
//! │   encode_command → frame        decode_response ← bytes      │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                  Connection (TCP)                            │
//! │     write length-prefixed frame, single bounded read         │
//! └─────────────────────────────────────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod network;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{EchoError, ProtocolError, Result};
pub use config::ClientConfig;
pub use client::{Client, SharedClient};
pub use protocol::{Amount, Command, Opcode, Response, Status, Value, ValueType};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of the client
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
