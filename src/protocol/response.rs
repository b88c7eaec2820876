//! Response definitions
//!
//! Represents decoded server responses.

use std::fmt;

use bytes::Bytes;

use crate::error::{EchoError, Result};

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Ok = 0x01,
    Error = 0x02,
}

impl Status {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Status::Ok),
            0x02 => Some(Status::Error),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Ok => f.write_str("OK"),
            Status::Error => f.write_str("ERROR"),
        }
    }
}

/// Value type tags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ValueType {
    Int = 1,
    Float = 2,
    String = 3,
    List = 4,
    /// Declared by the server, never decoded
    Map = 5,
    Long = 6,
}

impl ValueType {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(ValueType::Int),
            2 => Some(ValueType::Float),
            3 => Some(ValueType::String),
            4 => Some(ValueType::List),
            5 => Some(ValueType::Map),
            6 => Some(ValueType::Long),
            _ => None,
        }
    }
}

/// A decoded value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(u32),
    Float(f32),
    String(Bytes),
    List(Vec<Bytes>),
    Long(u64),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Int(_) => ValueType::Int,
            Value::Float(_) => ValueType::Float,
            Value::String(_) => ValueType::String,
            Value::List(_) => ValueType::List,
            Value::Long(_) => ValueType::Long,
        }
    }

    pub fn as_int(&self) -> Option<u32> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<u64> {
        match self {
            Value::Long(n) => Some(*n),
            _ => None,
        }
    }

    /// Counts come back as INT below `u32::MAX` and as LONG above it
    pub fn as_count(&self) -> Option<u64> {
        match self {
            Value::Int(n) => Some(u64::from(*n)),
            Value::Long(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::String(b) => Some(b),
            _ => None,
        }
    }

    /// The string payload, if it is valid UTF-8
    pub fn as_str(&self) -> Option<&str> {
        self.as_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }

    pub fn as_list(&self) -> Option<&[Bytes]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "(integer) {}", n),
            Value::Float(n) => write!(f, "(float) {}", n),
            Value::Long(n) => write!(f, "(long) {}", n),
            Value::String(b) => write!(f, "\"{}\"", String::from_utf8_lossy(b)),
            Value::List(items) if items.is_empty() => f.write_str("(empty list)"),
            Value::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}) \"{}\"", i + 1, String::from_utf8_lossy(item))?;
                }
                Ok(())
            }
        }
    }
}

/// A decoded response: status plus the value that followed it
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Status code
    pub status: Status,

    /// Result for OK, message for ERROR
    pub value: Value,
}

impl Response {
    pub fn new(status: Status, value: Value) -> Self {
        Self { status, value }
    }

    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }

    /// The server's message when the status is ERROR
    pub fn error_message(&self) -> Option<String> {
        match (self.status, &self.value) {
            (Status::Ok, _) => None,
            (Status::Error, Value::String(b)) => Some(String::from_utf8_lossy(b).into_owned()),
            (Status::Error, other) => Some(other.to_string()),
        }
    }

    /// Turn an ERROR response into `EchoError::Application`
    pub fn into_result(self) -> Result<Value> {
        match self.error_message() {
            Some(message) => Err(EchoError::Application(message)),
            None => Ok(self.value),
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Status::Ok => write!(f, "{}", self.value),
            Status::Error => write!(f, "(error) {}", self.error_message().unwrap_or_default()),
        }
    }
}
