//! Boundary command handling
//!
//! Decodes the four parameter slots of a boundary call into a typed request
//! for the `Dispatcher`, and writes the marshalled result back.  The slot
//! signature is checked before anything else is looked at, and output slots
//! are only written once the whole command has succeeded.
//!
//! ## Authors
//!
//! The Script Gateway Development Team.
//!
//! ## Licensing and copyright notice
//!
//! See the `LICENSE.md` file in the Script Gateway root directory for
//! information on licensing and copyright.

use super::Dispatcher;
use crate::{
    error::GatewayError,
    opcode::Command,
    params::{Parameters, Value},
};
use log::{debug, info};
use script_engine::MarshalledValue;
use std::convert::TryFrom;

/// Rejects `params` unless its slot types are exactly `command`'s signature.
pub fn check_signature(command: Command, params: &Parameters) -> Result<(), GatewayError> {
    let found = params.types();
    let expected = command.signature();
    if found != expected {
        return Err(GatewayError::BadParameters(format!(
            "{:?} expects slots {:?}, found {:?}",
            command, expected, found
        )));
    }
    Ok(())
}

impl Dispatcher {
    /// Entry point for one boundary call.
    pub fn dispatch(&self, command_id: u32, params: &mut Parameters) -> Result<(), GatewayError> {
        let command = Command::try_from(command_id)?;
        check_signature(command, params)?;
        info!("Dispatching {:?}", command);

        match command {
            Command::RunInline => self.dispatch_run_inline(params),
            Command::RunSaved => self.dispatch_run_saved(params),
            Command::Save => self.dispatch_save(params),
        }
    }

    fn dispatch_run_inline(&self, params: &mut Parameters) -> Result<(), GatewayError> {
        let script = params.0.as_memref()?.to_vec();
        let encrypted = params.2.as_value()?.a != 0;
        let input = self.read_argument(params)?;
        debug!(
            "RunInline: {} byte {} script",
            script.len(),
            if encrypted { "sealed" } else { "plaintext" }
        );

        let output = self.run_inline(&script, encrypted, &input)?;
        self.write_result(params, &output)
    }

    fn dispatch_run_saved(&self, params: &mut Parameters) -> Result<(), GatewayError> {
        let name = params.0.as_memref()?.to_vec();
        let input = self.read_argument(params)?;

        let output = self.run_saved(&name, &input)?;
        self.write_result(params, &output)
    }

    fn dispatch_save(&self, params: &mut Parameters) -> Result<(), GatewayError> {
        let name = params.0.as_memref()?.to_vec();
        let body = params.1.as_memref()?.to_vec();
        let encrypted = params.2.as_value()?.a != 0;
        debug!(
            "Save: {} byte {} script",
            body.len(),
            if encrypted { "sealed" } else { "plaintext" }
        );

        self.save(&name, &body, encrypted)
    }

    /// Reads the argument from slot 1 `(tag, number)` and slot 3 (text).
    fn read_argument(&self, params: &Parameters) -> Result<MarshalledValue, GatewayError> {
        let Value { a: tag, b: number } = params.1.as_value()?;
        let buffer = params.3.as_memref()?;
        Ok(MarshalledValue::from_slots(
            tag,
            number,
            buffer,
            self.context().buffer_capacity(),
        )?)
    }

    /// Writes `output` into slots 1 and 3.  The slot contents are computed
    /// in full before either slot is touched.
    fn write_result(
        &self,
        params: &mut Parameters,
        output: &MarshalledValue,
    ) -> Result<(), GatewayError> {
        let (tag, number, text) = output.to_slots(self.context().buffer_capacity())?;
        params.1.set_value(Value::new(tag, number))?;
        params.3.set_memref(text)
    }
}
