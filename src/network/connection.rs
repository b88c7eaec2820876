//! Connection Handler
//!
//! Owns the TCP stream to one EchoRS server and performs request/response
//! exchanges on it, one at a time.

use std::io::ErrorKind;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};

use bytes::Bytes;

use crate::config::ClientConfig;
use crate::error::{EchoError, ProtocolError, Result};
use crate::protocol::{read_response_bytes, write_command, Command};

/// A single blocking connection to the server
pub struct Connection {
    /// TCP stream (the protocol has no request ids, so it is never shared)
    stream: TcpStream,

    /// Size of the single read used per response
    max_response_size: usize,

    /// Peer address for logging
    peer_addr: String,

    /// Set once an exchange fails part-way
    poisoned: bool,
}

impl Connection {
    /// Connect using the address and timeouts in `config`
    pub fn connect(config: &ClientConfig) -> Result<Self> {
        config.validate()?;

        let stream = open_stream(config)?;

        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| config.server_addr.clone());

        stream.set_nodelay(config.nodelay)?;
        stream.set_read_timeout(config.read_timeout())?;
        stream.set_write_timeout(config.write_timeout())?;

        tracing::debug!("Connected to {}", peer_addr);

        Ok(Self {
            stream,
            max_response_size: config.max_response_size,
            peer_addr,
            poisoned: false,
        })
    }

    /// Send one command and collect the raw response buffer.
    ///
    /// Blocks until the server answers, the read times out, or the
    /// connection drops. Transport failures are returned as-is, never retried.
    /// After a failed exchange the connection is poisoned: a late or
    /// partially read reply would otherwise be taken for the next response.
    fn round_trip(&mut self, command: &Command) -> Result<Bytes> {
        if self.poisoned {
            return Err(EchoError::Poisoned);
        }

        let result = self.exchange(command);
        if let Err(ref e) = result {
            let overflow = matches!(e, EchoError::Protocol(ProtocolError::ResponseOverflow { .. }));
            if e.is_transport() || overflow {
                self.poisoned = true;
            }
        }
        result
    }

    /// Round trip `command` and decode the reply with `decode`.
    ///
    /// A reply that fails to decode may have arrived in pieces, so its tail
    /// can still be in flight; the connection is poisoned in that case too.
    pub fn request<T, F>(&mut self, command: &Command, decode: F) -> Result<T>
    where
        F: FnOnce(&[u8]) -> Result<T>,
    {
        let bytes = self.round_trip(command)?;
        decode(&bytes).map_err(|e| {
            tracing::warn!(
                "Undecodable reply to {:?} from {}: {}",
                command.opcode(),
                self.peer_addr,
                e
            );
            self.poisoned = true;
            e
        })
    }

    fn exchange(&mut self, command: &Command) -> Result<Bytes> {
        tracing::trace!("Sending {:?} to {}", command.opcode(), self.peer_addr);

        if let Err(e) = write_command(&mut self.stream, command) {
            tracing::warn!("Error writing to {}: {}", self.peer_addr, e);
            return Err(e);
        }

        match read_response_bytes(&mut self.stream, self.max_response_size) {
            Ok(bytes) => {
                tracing::trace!("Received {} bytes from {}", bytes.len(), self.peer_addr);
                Ok(bytes)
            }
            Err(EchoError::Transport(ref e))
                if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
            {
                // WouldBlock on Unix, TimedOut on Windows
                tracing::warn!("Read timeout waiting for {}", self.peer_addr);
                Err(EchoError::Transport(std::io::Error::new(
                    ErrorKind::TimedOut,
                    format!("no response from {} before read timeout", self.peer_addr),
                )))
            }
            Err(e) => {
                tracing::warn!("Error reading from {}: {}", self.peer_addr, e);
                Err(e)
            }
        }
    }

    /// True once an exchange has failed part-way
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        tracing::debug!("Closing connection to {}", self.peer_addr);
    }
}

/// Try each resolved address in turn, keeping the last failure
fn open_stream(config: &ClientConfig) -> Result<TcpStream> {
    let addrs: Vec<SocketAddr> = config.server_addr.to_socket_addrs()?.collect();
    if addrs.is_empty() {
        return Err(EchoError::Config(format!(
            "address {} did not resolve",
            config.server_addr
        )));
    }

    let mut last_err = None;
    for addr in addrs {
        let attempt = match config.connect_timeout() {
            Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
            None => TcpStream::connect(addr),
        };
        match attempt {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                tracing::debug!("Connect to {} failed: {}", addr, e);
                last_err = Some(e);
            }
        }
    }

    Err(last_err
        .map(EchoError::Transport)
        .unwrap_or(EchoError::ConnectionClosed))
}
