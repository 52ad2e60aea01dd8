//! The Script Gateway Runtime Manager
//!
//! The trusted side of the gateway.  Boundary calls arrive as a command id
//! plus four typed parameter slots; the runtime manager checks the slot
//! signature, authenticates and decrypts sealed scripts, loads and saves
//! named scripts, runs scripts in a fresh restricted interpreter, and
//! marshals the single result back into the slots.
//!
//! ## Authors
//!
//! The Script Gateway Development Team.
//!
//! ## Licensing and copyright notice
//!
//! See the `LICENSE.md` file in the Script Gateway root directory for
//! information on licensing and copyright.

pub mod config;
pub mod error;
pub mod managers;
pub mod opcode;
pub mod params;

pub use config::GatewayConfig;
pub use error::{ErrorCode, ErrorOrigin, GatewayError};
pub use managers::{
    command_manager::check_signature,
    session_manager::{Session, SessionManager},
    Dispatcher, DispatcherContext, HOST_CALL_NAME,
};
pub use opcode::{Command, GATEWAY_UUID, MODE_ENCRYPTED, MODE_PLAINTEXT};
pub use params::{ParamType, Parameter, Parameters, Value};
