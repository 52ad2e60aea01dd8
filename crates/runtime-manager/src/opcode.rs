//! Command identifiers and their parameter signatures
//!
//! ## Authors
//!
//! The Script Gateway Development Team.
//!
//! ## Licensing and copyright notice
//!
//! See the `LICENSE.md` file in the Script Gateway root directory for
//! information on licensing and copyright.

use crate::{error::GatewayError, params::ParamType};
use std::convert::TryFrom;
use uuid::Uuid;

/// Identity of the gateway trusted application, as requested by clients
/// opening a session.
pub const GATEWAY_UUID: Uuid = Uuid::from_u128(0xdebd5a03_e1c1_4e16_89a9_c294e3d78cd5);

/// Value of the encryption flag slot for a plaintext script.
pub const MODE_PLAINTEXT: u64 = 0;
/// Value of the encryption flag slot for a sealed payload.  Any non-zero
/// value is treated as encrypted.
pub const MODE_ENCRYPTED: u64 = 1;

/// Commands accepted by the gateway.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Run a script supplied in the call, optionally sealed.
    RunInline,
    /// Run a previously saved script by name.
    RunSaved,
    /// Save a script, optionally sealed, under a name.
    Save,
}

impl Command {
    #[inline]
    pub fn id(&self) -> u32 {
        match self {
            Command::RunInline => 1,
            Command::RunSaved => 2,
            Command::Save => 3,
        }
    }

    /// The exact slot types a call to this command must carry.
    pub fn signature(&self) -> [ParamType; 4] {
        match self {
            // script, (tag, number), encryption flag, text buffer
            Command::RunInline => [
                ParamType::MemrefInput,
                ParamType::ValueInout,
                ParamType::ValueInput,
                ParamType::MemrefInout,
            ],
            // name, (tag, number), unused flag, text buffer
            Command::RunSaved => [
                ParamType::MemrefInput,
                ParamType::ValueInout,
                ParamType::ValueInput,
                ParamType::MemrefInout,
            ],
            // name, script, encryption flag
            Command::Save => [
                ParamType::MemrefInput,
                ParamType::MemrefInput,
                ParamType::ValueInput,
                ParamType::None,
            ],
        }
    }
}

impl TryFrom<u32> for Command {
    type Error = GatewayError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Command::RunInline),
            2 => Ok(Command::RunSaved),
            3 => Ok(Command::Save),
            _ => Err(GatewayError::BadParameters(format!(
                "unknown command id {}",
                value
            ))),
        }
    }
}
