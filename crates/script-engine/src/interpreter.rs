//! The interpreter capability
//!
//! The runtime drives an interpreter as a stack machine: chunks and values
//! are pushed, `call` consumes a function and its arguments and pushes the
//! results, and results are popped back out as primitives.  Anything that
//! is not an integer or a string stays opaque on the stack and is only ever
//! turned into text by running more script code.
//!
//! ## Authors
//!
//! The Script Gateway Development Team.
//!
//! ## Licensing and copyright notice
//!
//! See the `LICENSE.md` file in the Script Gateway root directory for
//! information on licensing and copyright.

use crate::error::EngineError;

/// A host function exposed to scripts.  On entry the stack holds exactly
/// the declared number of arguments; whatever the function leaves on the
/// stack is returned to the script.
pub type HostCall = Box<dyn Fn(&mut dyn Interpreter) -> Result<(), EngineError>>;

/// The observable kind of the value on top of the stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueKind {
    /// An integer, or a float with an exact integral value.
    Integer,
    /// A string holding valid UTF-8.
    Text,
    /// Anything else.
    Other,
}

pub trait Interpreter {
    /// Compiles `source` as a text chunk and pushes the resulting function.
    fn load(&mut self, source: &[u8], chunk_name: &str) -> Result<(), EngineError>;

    fn push_integer(&mut self, value: i64);

    fn push_text(&mut self, value: &str) -> Result<(), EngineError>;

    /// Pushes a second reference to the value on top of the stack.
    fn duplicate_top(&mut self) -> Result<(), EngineError>;

    /// Pops the top value and binds it to the global `name`.
    fn set_global(&mut self, name: &str) -> Result<(), EngineError>;

    /// Exchanges the two topmost values.
    fn swap(&mut self) -> Result<(), EngineError>;

    /// Pops `argc` arguments and then a function, calls the function and
    /// pushes exactly `retc` results, padding with `nil` or dropping extras.
    fn call(&mut self, argc: usize, retc: usize) -> Result<(), EngineError>;

    fn peek_kind(&self) -> Result<ValueKind, EngineError>;

    /// Pops a value of kind `ValueKind::Integer`.
    fn pop_integer(&mut self) -> Result<i64, EngineError>;

    /// Pops a value of kind `ValueKind::Text`.
    fn pop_text(&mut self) -> Result<String, EngineError>;

    /// Number of values currently on the stack.
    fn depth(&self) -> usize;

    /// Binds `call` to the global `name`, taking `arity` arguments.
    fn bind_host_call(&mut self, name: &str, arity: usize, call: HostCall)
        -> Result<(), EngineError>;
}

/// Creates a fresh, isolated interpreter for every command.
pub trait InterpreterFactory: Send + Sync {
    fn create(&self) -> Result<Box<dyn Interpreter>, EngineError>;
}
