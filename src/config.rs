//! Configuration for the EchoRS client
//!
//! Centralized configuration with sensible defaults.

use std::time::Duration;

use crate::error::{EchoError, Result};

/// Read size used by the reference PHP client
pub const DEFAULT_MAX_RESPONSE_SIZE: usize = 8096;

/// Main configuration for a client connection
#[derive(Debug, Clone)]
pub struct ClientConfig {
    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// Server address (host:port)
    pub server_addr: String,

    /// Connect timeout (milliseconds, 0 = OS default)
    pub connect_timeout_ms: u64,

    /// Connection read timeout (milliseconds, 0 = block forever)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 = block forever)
    pub write_timeout_ms: u64,

    /// Disable Nagle's algorithm
    pub nodelay: bool,

    // -------------------------------------------------------------------------
    // Protocol Configuration
    // -------------------------------------------------------------------------
    /// Size of the single read used to collect a response.
    /// Responses are not length-prefixed, so anything past this is lost.
    pub max_response_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:9000".to_string(),
            connect_timeout_ms: 5000,
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
            nodelay: true,
            max_response_size: DEFAULT_MAX_RESPONSE_SIZE,
        }
    }
}

impl ClientConfig {
    /// Create a new config builder
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Check the values a connection cannot work without
    pub fn validate(&self) -> Result<()> {
        if self.server_addr.trim().is_empty() {
            return Err(EchoError::Config("server address is empty".to_string()));
        }
        // status byte + value tag
        if self.max_response_size < 2 {
            return Err(EchoError::Config(format!(
                "max_response_size must be at least 2 bytes, got {}",
                self.max_response_size
            )));
        }
        Ok(())
    }

    pub(crate) fn connect_timeout(&self) -> Option<Duration> {
        millis(self.connect_timeout_ms)
    }

    pub(crate) fn read_timeout(&self) -> Option<Duration> {
        millis(self.read_timeout_ms)
    }

    pub(crate) fn write_timeout(&self) -> Option<Duration> {
        millis(self.write_timeout_ms)
    }
}

fn millis(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

/// Builder for ClientConfig
#[derive(Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Set the server address (host:port)
    pub fn server_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.server_addr = addr.into();
        self
    }

    /// Set the connect timeout (in milliseconds)
    pub fn connect_timeout_ms(mut self, ms: u64) -> Self {
        self.config.connect_timeout_ms = ms;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Enable or disable TCP_NODELAY
    pub fn nodelay(mut self, enabled: bool) -> Self {
        self.config.nodelay = enabled;
        self
    }

    /// Set the response read buffer size (in bytes)
    pub fn max_response_size(mut self, size: usize) -> Self {
        self.config.max_response_size = size;
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}
