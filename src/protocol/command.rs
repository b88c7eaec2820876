//! Command definitions
//!
//! Represents the commands a client can send to an EchoRS server.

/// Operation codes, transmitted as 2 little-endian bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Opcode {
    Info = 0x0000,
    Test = 0x0001,
    SetString = 0x0002,
    SetInt = 0x0003,
    SetFloat = 0x0004,
    Get = 0x0005,
    Delete = 0x0006,
    IncrementInt = 0x0007,
    IncrementFloat = 0x0008,
    ListPush = 0x0009,
    ListPop = 0x000a,
    ListRange = 0x000b,
    ListExtract = 0x000c,
    ListLength = 0x000d,
    HllAdd = 0x000e,
    HllCount = 0x000f,
    HllReset = 0x0010,
    Unknown = 0x0011,
}

impl Opcode {
    /// Every opcode in wire order
    pub const ALL: [Opcode; 18] = [
        Opcode::Info,
        Opcode::Test,
        Opcode::SetString,
        Opcode::SetInt,
        Opcode::SetFloat,
        Opcode::Get,
        Opcode::Delete,
        Opcode::IncrementInt,
        Opcode::IncrementFloat,
        Opcode::ListPush,
        Opcode::ListPop,
        Opcode::ListRange,
        Opcode::ListExtract,
        Opcode::ListLength,
        Opcode::HllAdd,
        Opcode::HllCount,
        Opcode::HllReset,
        Opcode::Unknown,
    ];

    /// Map a numeric tag to an opcode. Unassigned tags become `Unknown`,
    /// matching how the server classifies them.
    pub fn from_u16(value: u16) -> Self {
        Self::ALL
            .get(value as usize)
            .copied()
            .unwrap_or(Opcode::Unknown)
    }

    pub fn from_le_bytes(bytes: [u8; 2]) -> Self {
        Self::from_u16(u16::from_le_bytes(bytes))
    }

    pub fn to_le_bytes(self) -> [u8; 2] {
        (self as u16).to_le_bytes()
    }
}

/// Optional trailing numeric argument.
///
/// `Default` encodes no field at all; the server then applies its own default
/// (an increment of 1, a pop of one element). `By(0)` is a real zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Amount<T> {
    Default,
    By(T),
}

impl<T> From<Option<T>> for Amount<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Amount::By(v),
            None => Amount::Default,
        }
    }
}

/// A command ready to be encoded
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Server statistics as plain text
    Info,

    /// Liveness check
    Test,

    /// Store a string value
    SetString { key: Vec<u8>, value: Vec<u8> },

    /// Store an integer value
    SetInt { key: Vec<u8>, value: u32 },

    /// Store a float value
    SetFloat { key: Vec<u8>, value: f32 },

    /// Read a scalar value
    Get { key: Vec<u8> },

    /// Remove one or more keys
    Delete { keys: Vec<Vec<u8>> },

    /// Add to an integer counter
    IncrementInt { key: Vec<u8>, amount: Amount<u32> },

    /// Add to a float counter
    IncrementFloat { key: Vec<u8>, amount: Amount<f32> },

    /// Append members (already in text form) to a list
    ListPush { key: Vec<u8>, values: Vec<String> },

    /// Pop members from the tail of a list
    ListPop { key: Vec<u8>, count: Amount<u32> },

    /// Read list members in `[start, end)`
    ListRange { key: Vec<u8>, start: u32, end: u32 },

    /// Remove and return list members in `[start, end)`
    ListExtract { key: Vec<u8>, start: u32, end: u32 },

    /// Number of list members
    ListLength { key: Vec<u8> },

    /// Add members (already in text form) to a HyperLogLog
    HllAdd { key: Vec<u8>, values: Vec<String> },

    /// Estimated HyperLogLog cardinality
    HllCount { key: Vec<u8> },

    /// Clear a HyperLogLog
    HllReset { key: Vec<u8> },

    /// Any opcode with caller-built argument fields
    Raw { opcode: Opcode, args: Vec<Vec<u8>> },
}

impl Command {
    /// Get the opcode this command is sent with
    pub fn opcode(&self) -> Opcode {
        match self {
            Command::Info => Opcode::Info,
            Command::Test => Opcode::Test,
            Command::SetString { .. } => Opcode::SetString,
            Command::SetInt { .. } => Opcode::SetInt,
            Command::SetFloat { .. } => Opcode::SetFloat,
            Command::Get { .. } => Opcode::Get,
            Command::Delete { .. } => Opcode::Delete,
            Command::IncrementInt { .. } => Opcode::IncrementInt,
            Command::IncrementFloat { .. } => Opcode::IncrementFloat,
            Command::ListPush { .. } => Opcode::ListPush,
            Command::ListPop { .. } => Opcode::ListPop,
            Command::ListRange { .. } => Opcode::ListRange,
            Command::ListExtract { .. } => Opcode::ListExtract,
            Command::ListLength { .. } => Opcode::ListLength,
            Command::HllAdd { .. } => Opcode::HllAdd,
            Command::HllCount { .. } => Opcode::HllCount,
            Command::HllReset { .. } => Opcode::HllReset,
            Command::Raw { opcode, .. } => *opcode,
        }
    }

    /// Build a LIST push, converting each member to its text form
    pub fn list_push<I, V>(key: impl AsRef<[u8]>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        Command::ListPush {
            key: key.as_ref().to_vec(),
            values: to_text(values),
        }
    }

    /// Build an HLL add, converting each member to its text form
    pub fn hll_add<I, V>(key: impl AsRef<[u8]>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        Command::HllAdd {
            key: key.as_ref().to_vec(),
            values: to_text(values),
        }
    }
}

fn to_text<I, V>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = V>,
    V: ToString,
{
    values.into_iter().map(|v| v.to_string()).collect()
}
