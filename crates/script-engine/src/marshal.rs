//! Cross-boundary value marshalling
//!
//! A `MarshalledValue` travels in two transport slots: the scalar pair
//! `(tag, number)` and the secondary byte buffer.  Numbers live entirely in
//! the scalar pair.  `Text` and `Code` place their UTF-8 bytes in the
//! buffer, bounded by its capacity, and report the byte length in the
//! scalar.
//!
//! ## Authors
//!
//! The Script Gateway Development Team.
//!
//! ## Licensing and copyright notice
//!
//! See the `LICENSE.md` file in the Script Gateway root directory for
//! information on licensing and copyright.

use crate::{
    error::EngineError,
    interpreter::{Interpreter, ValueKind},
};
use std::fmt;

pub const TAG_NUMBER: u64 = 0;
pub const TAG_TEXT: u64 = 1;
pub const TAG_CODE: u64 = 2;

/// Capacity of the secondary buffer slot, in bytes.
pub const DEFAULT_BUFFER_CAPACITY: usize = 8192;

/// The dump-to-source routine used for every value that is neither an
/// integer nor a UTF-8 string.  Called with the value as its one argument,
/// it returns a chunk of the form `return <expr>`.
pub const DUMP_SCRIPT: &str = include_str!("scripts/dump.lua");

const DUMP_CHUNK_NAME: &str = "dump";
const CODE_CHUNK_NAME: &str = "marshalled_value";

/// One value crossing the boundary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MarshalledValue {
    Number(i64),
    Text(String),
    /// Source text that evaluates to the value.
    Code(String),
}

impl MarshalledValue {
    #[inline]
    pub fn tag(&self) -> u64 {
        match self {
            MarshalledValue::Number(_) => TAG_NUMBER,
            MarshalledValue::Text(_) => TAG_TEXT,
            MarshalledValue::Code(_) => TAG_CODE,
        }
    }

    /// Reads a value from the tag slot, the scalar slot and the buffer
    /// slot.  For `Text` and `Code` the whole buffer is the payload and the
    /// scalar is ignored.
    pub fn from_slots(
        tag: u64,
        number: u64,
        buffer: &[u8],
        capacity: usize,
    ) -> Result<Self, EngineError> {
        match tag {
            TAG_NUMBER => Ok(MarshalledValue::Number(number as i64)),
            TAG_TEXT | TAG_CODE => {
                if buffer.len() > capacity {
                    return Err(EngineError::CapacityError(buffer.len(), capacity));
                }
                let text =
                    String::from_utf8(buffer.to_vec()).map_err(|_| EngineError::InvalidText)?;
                if tag == TAG_TEXT {
                    Ok(MarshalledValue::Text(text))
                } else {
                    Ok(MarshalledValue::Code(text))
                }
            }
            unknown => Err(EngineError::UnknownTag(unknown)),
        }
    }

    /// Produces the `(tag, scalar, buffer)` triple for the output slots.
    pub fn to_slots(&self, capacity: usize) -> Result<(u64, u64, Vec<u8>), EngineError> {
        match self {
            MarshalledValue::Number(number) => Ok((TAG_NUMBER, *number as u64, Vec::new())),
            MarshalledValue::Text(text) | MarshalledValue::Code(text) => {
                if text.len() > capacity {
                    return Err(EngineError::CapacityError(text.len(), capacity));
                }
                Ok((self.tag(), text.len() as u64, text.as_bytes().to_vec()))
            }
        }
    }
}

impl fmt::Display for MarshalledValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarshalledValue::Number(number) => write!(f, "Number({})", number),
            MarshalledValue::Text(text) => write!(f, "Text({:?})", text),
            MarshalledValue::Code(code) => write!(f, "Code({:?})", code),
        }
    }
}

/// Pops the value on top of `interpreter`'s stack and marshals it.
pub fn encode(interpreter: &mut dyn Interpreter) -> Result<MarshalledValue, EngineError> {
    match interpreter.peek_kind()? {
        ValueKind::Integer => Ok(MarshalledValue::Number(interpreter.pop_integer()?)),
        ValueKind::Text => Ok(MarshalledValue::Text(interpreter.pop_text()?)),
        ValueKind::Other => {
            interpreter.load(DUMP_SCRIPT.as_bytes(), DUMP_CHUNK_NAME)?;
            interpreter.swap()?;
            interpreter.call(1, 1)?;
            Ok(MarshalledValue::Code(interpreter.pop_text()?))
        }
    }
}

/// Pushes `value` onto `interpreter`'s stack, evaluating `Code`.
pub fn decode(
    value: &MarshalledValue,
    interpreter: &mut dyn Interpreter,
) -> Result<(), EngineError> {
    match value {
        MarshalledValue::Number(number) => {
            interpreter.push_integer(*number);
            Ok(())
        }
        MarshalledValue::Text(text) => interpreter.push_text(text),
        MarshalledValue::Code(code) => {
            interpreter.load(code.as_bytes(), CODE_CHUNK_NAME)?;
            interpreter.call(0, 1)
        }
    }
}
