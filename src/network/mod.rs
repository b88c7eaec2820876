//! Network Module
//!
//! TCP transport for the client.
//!
//! ## Model
//! - One blocking `TcpStream` per connection
//! - Exactly one command in flight: write a frame, read one response
//! - No reconnects or retries

mod connection;

pub use connection::Connection;
