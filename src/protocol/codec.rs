//! Protocol codec
//!
//! Encoding of commands and decoding of responses.
//!
//! ## Wire Format
//!
//! ### Request Frame
//! ```text
//! ┌──────────┬───────────┬──────────┬──────────┬─────┐
//! │ Len (4)  │ Opcode(2) │ ArgLen(4)│ Arg      │ ... │
//! └──────────┴───────────┴──────────┴──────────┴─────┘
//! ```
//! `Len` counts everything after itself. All integers are little-endian.
//!
//! ### Response Buffer
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │Status(1) │ Type (1) │        Value payload        │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//! Responses carry no length prefix. The client reads once, up to a fixed
//! buffer size, and decodes from byte 0.
//!
//! ### Value Payloads
//! - INT:    u32 (4)
//! - FLOAT:  f32 (4)
//! - LONG:   u64 (8)
//! - STRING: len (4) + bytes
//! - LIST:   STRING values (each with its own type byte) until end of buffer

use std::io::{ErrorKind, Read, Write};

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::{Amount, Command, Response, Status, Value, ValueType};
use crate::error::{EchoError, ProtocolError, Result};

/// Size of every length prefix (frame and argument)
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Size of the opcode at the start of a command payload
pub const OPCODE_SIZE: usize = 2;

/// Size of a binary u32/f32 argument
const SCALAR_FIELD_SIZE: u32 = 4;

// =============================================================================
// Frame Codec
// =============================================================================

/// Prefix a payload with its u32 little-endian length
///
/// Payloads must fit a u32 length; `write_command` checks this before framing.
pub fn frame(payload: &[u8]) -> Bytes {
    debug_assert!(payload.len() <= u32::MAX as usize, "payload too large to frame");
    let mut buf = BytesMut::with_capacity(LENGTH_PREFIX_SIZE + payload.len());
    buf.put_u32_le(payload.len() as u32);
    buf.put_slice(payload);
    buf.freeze()
}

// =============================================================================
// Command Encoding
// =============================================================================

/// Encode a command payload: opcode followed by its argument fields
pub fn encode_command(command: &Command) -> Bytes {
    let mut buf = BytesMut::with_capacity(OPCODE_SIZE + 64);
    buf.put_slice(&command.opcode().to_le_bytes());

    match command {
        Command::Info | Command::Test => {}
        Command::Get { key }
        | Command::ListLength { key }
        | Command::HllCount { key }
        | Command::HllReset { key } => {
            put_bytes_field(&mut buf, key);
        }
        Command::Delete { keys } => {
            for key in keys {
                put_bytes_field(&mut buf, key);
            }
        }
        Command::SetString { key, value } => {
            put_bytes_field(&mut buf, key);
            put_bytes_field(&mut buf, value);
        }
        Command::SetInt { key, value } => {
            put_bytes_field(&mut buf, key);
            put_u32_field(&mut buf, *value);
        }
        Command::SetFloat { key, value } => {
            put_bytes_field(&mut buf, key);
            put_f32_field(&mut buf, *value);
        }
        Command::IncrementInt { key, amount } | Command::ListPop { key, count: amount } => {
            put_bytes_field(&mut buf, key);
            if let Amount::By(n) = amount {
                put_u32_field(&mut buf, *n);
            }
        }
        Command::IncrementFloat { key, amount } => {
            put_bytes_field(&mut buf, key);
            if let Amount::By(n) = amount {
                put_f32_field(&mut buf, *n);
            }
        }
        Command::ListPush { key, values } | Command::HllAdd { key, values } => {
            put_bytes_field(&mut buf, key);
            for value in values {
                put_text_field(&mut buf, value);
            }
        }
        Command::ListRange { key, start, end } | Command::ListExtract { key, start, end } => {
            put_bytes_field(&mut buf, key);
            put_u32_field(&mut buf, *start);
            put_u32_field(&mut buf, *end);
        }
        Command::Raw { args, .. } => {
            for arg in args {
                put_bytes_field(&mut buf, arg);
            }
        }
    }

    buf.freeze()
}

/// Encode a command and wrap it in its length frame
pub fn encode_request(command: &Command) -> Bytes {
    frame(&encode_command(command))
}

/// Raw bytes field (keys, string values)
fn put_bytes_field(buf: &mut BytesMut, field: &[u8]) {
    debug_assert!(field.len() <= u32::MAX as usize, "field too large to encode");
    buf.put_u32_le(field.len() as u32);
    buf.put_slice(field);
}

/// Variadic list/HLL member, sent as text
fn put_text_field(buf: &mut BytesMut, text: &str) {
    put_bytes_field(buf, text.as_bytes());
}

/// Binary u32 argument (amounts, counts, indices)
fn put_u32_field(buf: &mut BytesMut, n: u32) {
    buf.put_u32_le(SCALAR_FIELD_SIZE);
    buf.put_u32_le(n);
}

/// Binary f32 argument
fn put_f32_field(buf: &mut BytesMut, n: f32) {
    buf.put_u32_le(SCALAR_FIELD_SIZE);
    buf.put_f32_le(n);
}

// =============================================================================
// Response Decoding
// =============================================================================

/// Decode a response buffer into its status and first value.
///
/// Bytes after a scalar value are ignored; a LIST always runs to the end.
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    let mut buf = bytes;
    let status = decode_status(&mut buf)?;
    let value = decode_value(&mut buf)?;

    if buf.has_remaining() {
        tracing::trace!("Ignoring {} trailing response bytes", buf.remaining());
    }

    Ok(Response::new(status, value))
}

/// Decode a response whose values are concatenated back to back
/// (a multi-element pop). An empty remainder yields no values.
pub fn decode_values(bytes: &[u8]) -> Result<(Status, Vec<Value>)> {
    let mut buf = bytes;
    let status = decode_status(&mut buf)?;

    let mut values = Vec::new();
    while buf.has_remaining() {
        values.push(decode_value(&mut buf)?);
    }

    Ok((status, values))
}

/// Decode an INFO response.
///
/// On success the server writes bare text after the status byte, with no type
/// tag. Errors are still tagged values.
pub fn decode_text_response(bytes: &[u8]) -> Result<Response> {
    let mut buf = bytes;
    match decode_status(&mut buf)? {
        Status::Ok => Ok(Response::new(
            Status::Ok,
            Value::String(Bytes::copy_from_slice(buf)),
        )),
        Status::Error => Ok(Response::new(Status::Error, decode_value(&mut buf)?)),
    }
}

/// Decode one tagged value from the front of `buf`, advancing it
pub fn decode_value(buf: &mut &[u8]) -> Result<Value> {
    ensure(buf, 1, "value type tag")?;
    let tag = buf.get_u8();
    let value_type = ValueType::from_byte(tag).ok_or(ProtocolError::UnknownValueType(tag))?;

    let value = match value_type {
        ValueType::Int => {
            ensure(buf, 4, "INT value")?;
            Value::Int(buf.get_u32_le())
        }
        ValueType::Float => {
            ensure(buf, 4, "FLOAT value")?;
            Value::Float(buf.get_f32_le())
        }
        // The server writes counts with u64::to_le_bytes
        ValueType::Long => {
            ensure(buf, 8, "LONG value")?;
            Value::Long(buf.get_u64_le())
        }
        ValueType::String => Value::String(decode_string_body(buf)?),
        ValueType::List => {
            let mut items = Vec::new();
            while buf.has_remaining() {
                let element_tag = buf.get_u8();
                if element_tag != ValueType::String as u8 {
                    return Err(ProtocolError::UnexpectedListElement(element_tag).into());
                }
                items.push(decode_string_body(buf)?);
            }
            Value::List(items)
        }
        ValueType::Map => return Err(ProtocolError::UnsupportedValueType(ValueType::Map).into()),
    };

    Ok(value)
}

fn decode_status(buf: &mut &[u8]) -> Result<Status> {
    ensure(buf, 1, "status byte")?;
    let byte = buf.get_u8();
    Status::from_byte(byte).ok_or_else(|| ProtocolError::UnknownStatus(byte).into())
}

/// Length-prefixed string body (the type byte is already consumed)
fn decode_string_body(buf: &mut &[u8]) -> Result<Bytes> {
    ensure(buf, LENGTH_PREFIX_SIZE, "STRING length")?;
    let len = buf.get_u32_le() as usize;
    ensure(buf, len, "STRING payload")?;
    Ok(buf.copy_to_bytes(len))
}

fn ensure(buf: &&[u8], needed: usize, context: &'static str) -> Result<()> {
    if buf.remaining() < needed {
        return Err(ProtocolError::Truncated {
            context,
            needed,
            remaining: buf.remaining(),
        }
        .into());
    }
    Ok(())
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Write a framed command to a stream
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    let payload = encode_command(command);
    check_frame_len(payload.len())?;
    let bytes = frame(&payload);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

/// A payload longer than the u32 length prefix can describe is rejected
fn check_frame_len(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| ProtocolError::RequestTooLarge { len }.into())
}

/// Read one response buffer with a single bounded read.
///
/// A read that fills the whole buffer is reported as
/// `ProtocolError::ResponseOverflow`: the response may continue past it.
pub fn read_response_bytes<R: Read>(reader: &mut R, max_size: usize) -> Result<Bytes> {
    let mut buf = vec![0u8; max_size];
    let n = loop {
        match reader.read(&mut buf) {
            Ok(n) => break n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    };

    if n == 0 {
        return Err(EchoError::ConnectionClosed);
    }
    if n >= max_size {
        return Err(ProtocolError::ResponseOverflow { limit: max_size }.into());
    }

    buf.truncate(n);
    Ok(Bytes::from(buf))
}

/// Read and decode a response from a stream
pub fn read_response<R: Read>(reader: &mut R, max_size: usize) -> Result<Response> {
    let bytes = read_response_bytes(reader, max_size)?;
    decode_response(&bytes)
}
