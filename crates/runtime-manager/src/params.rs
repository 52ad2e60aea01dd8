//! The four-slot boundary transport
//!
//! Every boundary call carries exactly four typed parameter slots.  Buffers
//! are owned by the slot: the runtime copies them in once and replaces them
//! wholesale on output, never writing through a shared mapping.
//!
//! ## Authors
//!
//! The Script Gateway Development Team.
//!
//! ## Licensing and copyright notice
//!
//! See the `LICENSE.md` file in the Script Gateway root directory for
//! information on licensing and copyright.

use crate::error::GatewayError;

/// The declared type of one parameter slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamType {
    None,
    MemrefInput,
    MemrefOutput,
    MemrefInout,
    ValueInput,
    ValueOutput,
    ValueInout,
}

/// A scalar slot: a pair of 64-bit words.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Value {
    pub a: u64,
    pub b: u64,
}

impl Value {
    #[inline]
    pub fn new(a: u64, b: u64) -> Self {
        Value { a, b }
    }
}

/// One parameter slot and its contents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Parameter {
    None,
    MemrefInput(Vec<u8>),
    MemrefOutput(Vec<u8>),
    MemrefInout(Vec<u8>),
    ValueInput(Value),
    ValueOutput(Value),
    ValueInout(Value),
}

impl Default for Parameter {
    fn default() -> Self {
        Parameter::None
    }
}

impl Parameter {
    pub fn param_type(&self) -> ParamType {
        match self {
            Parameter::None => ParamType::None,
            Parameter::MemrefInput(_) => ParamType::MemrefInput,
            Parameter::MemrefOutput(_) => ParamType::MemrefOutput,
            Parameter::MemrefInout(_) => ParamType::MemrefInout,
            Parameter::ValueInput(_) => ParamType::ValueInput,
            Parameter::ValueOutput(_) => ParamType::ValueOutput,
            Parameter::ValueInout(_) => ParamType::ValueInout,
        }
    }

    /// The buffer of a memref slot.
    pub fn as_memref(&self) -> Result<&[u8], GatewayError> {
        match self {
            Parameter::MemrefInput(buffer)
            | Parameter::MemrefOutput(buffer)
            | Parameter::MemrefInout(buffer) => Ok(buffer.as_slice()),
            other => Err(GatewayError::BadParameters(format!(
                "expected a memref slot, found {:?}",
                other.param_type()
            ))),
        }
    }

    /// The contents of a value slot.
    pub fn as_value(&self) -> Result<Value, GatewayError> {
        match self {
            Parameter::ValueInput(value)
            | Parameter::ValueOutput(value)
            | Parameter::ValueInout(value) => Ok(*value),
            other => Err(GatewayError::BadParameters(format!(
                "expected a value slot, found {:?}",
                other.param_type()
            ))),
        }
    }

    /// Replaces the buffer of a writable memref slot.
    pub fn set_memref(&mut self, contents: Vec<u8>) -> Result<(), GatewayError> {
        match self {
            Parameter::MemrefOutput(buffer) | Parameter::MemrefInout(buffer) => {
                *buffer = contents;
                Ok(())
            }
            other => Err(GatewayError::BadParameters(format!(
                "slot {:?} is not a writable memref",
                other.param_type()
            ))),
        }
    }

    /// Replaces the contents of a writable value slot.
    pub fn set_value(&mut self, contents: Value) -> Result<(), GatewayError> {
        match self {
            Parameter::ValueOutput(value) | Parameter::ValueInout(value) => {
                *value = contents;
                Ok(())
            }
            other => Err(GatewayError::BadParameters(format!(
                "slot {:?} is not a writable value",
                other.param_type()
            ))),
        }
    }
}

/// The four slots of one boundary call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Parameters(pub Parameter, pub Parameter, pub Parameter, pub Parameter);

impl Parameters {
    #[inline]
    pub fn new(p0: Parameter, p1: Parameter, p2: Parameter, p3: Parameter) -> Self {
        Parameters(p0, p1, p2, p3)
    }

    /// Four unused slots.
    #[inline]
    pub fn none() -> Self {
        Parameters::default()
    }

    pub fn types(&self) -> [ParamType; 4] {
        [
            self.0.param_type(),
            self.1.param_type(),
            self.2.param_type(),
            self.3.param_type(),
        ]
    }
}
