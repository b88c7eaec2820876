//! Protocol Module
//!
//! Defines the EchoRS wire protocol.
//!
//! ## Request Format
//! ```text
//! ┌──────────┬───────────┬────────────────────────────────────┐
//! │ Len (4)  │ Opcode(2) │ (ArgLen (4) + Arg bytes) * N       │
//! └──────────┴───────────┴────────────────────────────────────┘
//! ```
//!
//! ## Response Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │Status(1) │ Type (1) │        Value payload        │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//! Responses are not length-prefixed.
//!
//! ### Status Codes
//! - 0x01: OK
//! - 0x02: ERROR
//!
//! ### Value Types
//! - 1: INT, 2: FLOAT, 3: STRING, 4: LIST, 5: MAP (undecodable), 6: LONG

mod command;
mod response;
mod codec;

pub use command::{Amount, Command, Opcode};
pub use response::{Response, Status, Value, ValueType};
pub use codec::{
    decode_response, decode_text_response, decode_value, decode_values, encode_command,
    encode_request, frame, read_response, read_response_bytes, write_command,
    LENGTH_PREFIX_SIZE, OPCODE_SIZE,
};
