//! Script engine errors
//!
//! ## Authors
//!
//! The Script Gateway Development Team.
//!
//! ## Licensing and copyright notice
//!
//! See the `LICENSE.md` file in the Script Gateway root directory for
//! information on licensing and copyright.

use err_derive::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The interpreter could not be created.
    #[error(display = "EngineError: failed to create interpreter: {}.", _0)]
    CreationError(String),
    /// A chunk failed to parse, or raised an error while running.
    #[error(display = "EngineError: script error: {}.", _0)]
    ScriptError(String),
    /// An operation needed more values than the evaluation stack held.
    #[error(
        display = "EngineError: stack underflow in {}: needed {} values, found {}.",
        _0,
        _1,
        _2
    )]
    StackUnderflow(&'static str, usize, usize),
    /// The value on top of the stack has the wrong kind for the operation.
    #[error(display = "EngineError: expected {} on top of the stack.", _0)]
    TypeError(&'static str),
    /// A text payload exceeds the secondary buffer.
    #[error(
        display = "EngineError: text payload of {} bytes exceeds buffer capacity {}.",
        _0,
        _1
    )]
    CapacityError(usize, usize),
    /// The type tag slot holds no known `MarshalledValue` tag.
    #[error(display = "EngineError: unknown value tag {}.", _0)]
    UnknownTag(u64),
    /// A text payload is not valid UTF-8.
    #[error(display = "EngineError: text payload is not valid UTF-8.")]
    InvalidText,
    /// A bound host function failed.
    #[error(display = "EngineError: host call {} failed: {}.", _0, _1)]
    HostCallError(String, String),
}
