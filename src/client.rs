//! Client API
//!
//! Named operations over one connection. Every operation encodes a
//! [`Command`], performs one round trip and returns the decoded
//! [`Response`]. A server-side failure is a `Response` with
//! `Status::Error`, not an `Err`.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::ClientConfig;
use crate::error::{ProtocolError, Result};
use crate::network::Connection;
use crate::protocol::{
    decode_response, decode_text_response, decode_values, Command, Response, Status, Value,
};

/// Blocking EchoRS client
///
/// ```ignore
/// use echors::Client;
///
/// let mut client = Client::connect_addr("127.0.0.1:9000")?;
/// client.set_string("name", "echo")?;
/// let resp = client.get("name")?;
/// assert_eq!(resp.value.as_str(), Some("echo"));
/// ```
pub struct Client {
    connection: Connection,
}

impl Client {
    /// Connect with the given configuration
    pub fn connect(config: ClientConfig) -> Result<Self> {
        let connection = Connection::connect(&config)?;
        Ok(Self { connection })
    }

    /// Connect to `addr` with default timeouts
    pub fn connect_addr(addr: impl Into<String>) -> Result<Self> {
        Self::connect(ClientConfig::builder().server_addr(addr).build())
    }

    /// Send any command and decode a single-value response
    pub fn execute(&mut self, command: &Command) -> Result<Response> {
        self.connection.request(command, decode_response)
    }

    /// Address of the server this client talks to
    pub fn peer_addr(&self) -> &str {
        self.connection.peer_addr()
    }

    /// True once an exchange has failed and the connection refuses further use
    pub fn is_poisoned(&self) -> bool {
        self.connection.is_poisoned()
    }

    // =========================================================================
    // Server
    // =========================================================================

    /// Server statistics. The text comes back as `Value::String`.
    pub fn info(&mut self) -> Result<Response> {
        self.connection.request(&Command::Info, decode_text_response)
    }

    pub fn test(&mut self) -> Result<Response> {
        self.execute(&Command::Test)
    }

    // =========================================================================
    // Scalars
    // =========================================================================

    pub fn set_string(
        &mut self,
        key: impl AsRef<[u8]>,
        value: impl AsRef<[u8]>,
    ) -> Result<Response> {
        self.execute(&Command::SetString {
            key: key.as_ref().to_vec(),
            value: value.as_ref().to_vec(),
        })
    }

    pub fn set_int(&mut self, key: impl AsRef<[u8]>, value: u32) -> Result<Response> {
        self.execute(&Command::SetInt {
            key: key.as_ref().to_vec(),
            value,
        })
    }

    pub fn set_float(&mut self, key: impl AsRef<[u8]>, value: f32) -> Result<Response> {
        self.execute(&Command::SetFloat {
            key: key.as_ref().to_vec(),
            value,
        })
    }

    pub fn get(&mut self, key: impl AsRef<[u8]>) -> Result<Response> {
        self.execute(&Command::Get {
            key: key.as_ref().to_vec(),
        })
    }

    /// Delete every key given; the server reports OK even for missing keys
    pub fn delete<I, K>(&mut self, keys: I) -> Result<Response>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<[u8]>,
    {
        self.execute(&Command::Delete {
            keys: keys.into_iter().map(|k| k.as_ref().to_vec()).collect(),
        })
    }

    // =========================================================================
    // Counters
    // =========================================================================

    /// Increment an integer. `None` lets the server apply its default of 1.
    pub fn increment_int(
        &mut self,
        key: impl AsRef<[u8]>,
        amount: Option<u32>,
    ) -> Result<Response> {
        self.execute(&Command::IncrementInt {
            key: key.as_ref().to_vec(),
            amount: amount.into(),
        })
    }

    /// Increment a float. `None` lets the server apply its default of 1.0.
    pub fn increment_float(
        &mut self,
        key: impl AsRef<[u8]>,
        amount: Option<f32>,
    ) -> Result<Response> {
        self.execute(&Command::IncrementFloat {
            key: key.as_ref().to_vec(),
            amount: amount.into(),
        })
    }

    // =========================================================================
    // Lists
    // =========================================================================

    /// Append members; each is sent as its text form
    pub fn list_push<I, V>(&mut self, key: impl AsRef<[u8]>, values: I) -> Result<Response>
    where
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        self.execute(&Command::list_push(key, values))
    }

    /// Pop `count` members (server default: 1) from the tail.
    ///
    /// On success the popped members are returned as a `Value::List`, last
    /// element first.
    pub fn list_pop(&mut self, key: impl AsRef<[u8]>, count: Option<u32>) -> Result<Response> {
        let command = Command::ListPop {
            key: key.as_ref().to_vec(),
            count: count.into(),
        };
        self.connection.request(&command, decode_popped)
    }

    /// Members in `[start, end)`, clamped by the server to the list length
    pub fn list_range(&mut self, key: impl AsRef<[u8]>, start: u32, end: u32) -> Result<Response> {
        self.execute(&Command::ListRange {
            key: key.as_ref().to_vec(),
            start,
            end,
        })
    }

    /// Like `list_range`, but the returned members are removed
    pub fn list_extract(
        &mut self,
        key: impl AsRef<[u8]>,
        start: u32,
        end: u32,
    ) -> Result<Response> {
        self.execute(&Command::ListExtract {
            key: key.as_ref().to_vec(),
            start,
            end,
        })
    }

    pub fn list_length(&mut self, key: impl AsRef<[u8]>) -> Result<Response> {
        self.execute(&Command::ListLength {
            key: key.as_ref().to_vec(),
        })
    }

    // =========================================================================
    // HyperLogLog
    // =========================================================================

    /// Add members; each is sent as its text form
    pub fn hll_add<I, V>(&mut self, key: impl AsRef<[u8]>, values: I) -> Result<Response>
    where
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        self.execute(&Command::hll_add(key, values))
    }

    /// Estimated cardinality, as `Value::Int` or `Value::Long` for huge sets
    pub fn hll_count(&mut self, key: impl AsRef<[u8]>) -> Result<Response> {
        self.execute(&Command::HllCount {
            key: key.as_ref().to_vec(),
        })
    }

    pub fn hll_reset(&mut self, key: impl AsRef<[u8]>) -> Result<Response> {
        self.execute(&Command::HllReset {
            key: key.as_ref().to_vec(),
        })
    }
}

/// A client handle that can be cloned across threads.
///
/// Calls are serialized by a mutex: the protocol cannot match interleaved
/// responses to requests, so only one command is ever in flight.
#[derive(Clone)]
pub struct SharedClient {
    inner: Arc<Mutex<Client>>,
}

impl SharedClient {
    pub fn new(client: Client) -> Self {
        Self {
            inner: Arc::new(Mutex::new(client)),
        }
    }

    /// Run `f` with exclusive access to the connection
    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Client) -> R,
    {
        let mut client = self.inner.lock();
        f(&mut client)
    }

    pub fn execute(&self, command: &Command) -> Result<Response> {
        self.with(|client| client.execute(command))
    }
}

impl From<Client> for SharedClient {
    fn from(client: Client) -> Self {
        Self::new(client)
    }
}

/// Collect the concatenated STRING values of a pop reply into one list
fn decode_popped(bytes: &[u8]) -> Result<Response> {
    let (status, values) = decode_values(bytes)?;

    match status {
        Status::Ok => {
            let items = values
                .into_iter()
                .map(|value| match value {
                    Value::String(b) => Ok(b),
                    other => Err(ProtocolError::UnexpectedListElement(
                        other.value_type() as u8,
                    )),
                })
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(Response::new(Status::Ok, Value::List(items)))
        }
        Status::Error => {
            let value = values.into_iter().next().ok_or(ProtocolError::Truncated {
                context: "error value",
                needed: 1,
                remaining: 0,
            })?;
            Ok(Response::new(Status::Error, value))
        }
    }
}
