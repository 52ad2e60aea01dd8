//! The Script Gateway script engine
//!
//! This crate provides the interpreter capability used by the trusted
//! runtime, together with the marshalling of a single value across the
//! four-slot boundary transport.  It consists of:
//!
//! 1. the `Interpreter` and `InterpreterFactory` traits, a small stack
//!    machine modelled on the Lua C API,
//! 2. a restricted Lua 5.4 backend for those traits,
//! 3. `MarshalledValue`, with `encode`/`decode` against an interpreter and the
//!    mapping of a value onto the transport's tag, number and text slots.
//!
//! Values other than integers and strings cross the boundary as source text
//! generated by a bundled dump routine, which the receiving interpreter
//! evaluates to rebuild the value.
//!
//! ## Authors
//!
//! The Script Gateway Development Team.
//!
//! ## Licensing and copyright notice
//!
//! See the `LICENSE.md` file in the Script Gateway root directory for
//! information on licensing and copyright.

pub mod error;
mod interpreter;
mod lua;
mod marshal;

pub use error::EngineError;
pub use interpreter::{HostCall, Interpreter, InterpreterFactory, ValueKind};
pub use lua::{LuaInterpreter, LuaInterpreterFactory};
pub use marshal::{
    decode, encode, MarshalledValue, DEFAULT_BUFFER_CAPACITY, DUMP_SCRIPT, TAG_CODE, TAG_NUMBER,
    TAG_TEXT,
};

/// Chunk name under which boundary-supplied scripts are loaded.
pub const SCRIPT_CHUNK_NAME: &str = "lua_script";

/// Name of the global through which a script also sees its argument.
pub const ARGUMENT_GLOBAL: &str = "arg";

/// Runs `script` on `interpreter` with the single argument `input` and
/// returns its single (marshalled) result.
///
/// The argument is passed both as the chunk's vararg and as the global
/// `arg`.  Extra results are discarded and a missing result reads as `nil`.
pub fn execute(
    interpreter: &mut dyn Interpreter,
    script: &[u8],
    input: &MarshalledValue,
) -> Result<MarshalledValue, EngineError> {
    interpreter.load(script, SCRIPT_CHUNK_NAME)?;
    decode(input, interpreter)?;
    interpreter.duplicate_top()?;
    interpreter.set_global(ARGUMENT_GLOBAL)?;
    interpreter.call(1, 1)?;
    encode(interpreter)
}
