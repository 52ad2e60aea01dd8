//! Runtime Manager errors and boundary result codes
//!
//! Internally every failure is a `GatewayError` carrying diagnostic detail.
//! Only its numeric code, plus an origin, ever crosses the boundary.
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
use payload_crypto::CryptoError;
use script_engine::EngineError;
use script_store::StoreError;
use std::fmt;

////////////////////////////////////////////////////////////////////////////////
// Result codes.
////////////////////////////////////////////////////////////////////////////////

pub const CODE_GENERIC: u32 = 0xFFFF_0000;
pub const CODE_BAD_FORMAT: u32 = 0xFFFF_0005;
pub const CODE_BAD_PARAMETERS: u32 = 0xFFFF_0006;
pub const CODE_BAD_STATE: u32 = 0xFFFF_0007;
pub const CODE_ITEM_NOT_FOUND: u32 = 0xFFFF_0008;
pub const CODE_SHORT_BUFFER: u32 = 0xFFFF_0010;
pub const CODE_OVERFLOW: u32 = 0xFFFF_300F;
pub const CODE_MAC_INVALID: u32 = 0xFFFF_3071;
pub const CODE_STORAGE_NOT_AVAILABLE: u32 = 0xF010_0003;
/// Gateway-defined: the script failed to load or raised an error.
pub const CODE_SCRIPT_FAILED: u32 = 0x8000_0001;
/// Gateway-defined: the runtime configuration is unusable.
pub const CODE_BAD_CONFIGURATION: u32 = 0x8000_0002;

/// Where a failure was detected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorOrigin {
    /// The client API, before the call reached the gateway.
    Api = 1,
    /// The transport between the domains.
    Communication = 2,
    /// The trusted OS.
    Tee = 3,
    /// The gateway's own command logic.
    TrustedApp = 4,
}

/// What the untrusted caller gets back for a failed boundary call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ErrorCode {
    pub code: u32,
    pub origin: ErrorOrigin,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X} (origin {:?})", self.code, self.origin)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Errors.
////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(
        display = "RuntimeManager: payload of {} bytes is shorter than the {}-byte header.",
        _0,
        _1
    )]
    FormatError(usize, usize),
    #[error(display = "RuntimeManager: payload authentication failed.")]
    AuthenticationError,
    #[error(display = "RuntimeManager: crypto backend failure: {}.", _0)]
    CryptoBackendError(String),
    #[error(display = "RuntimeManager: bad parameters: {}.", _0)]
    BadParameters(String),
    #[error(display = "RuntimeManager: no script named {:?}.", _0)]
    NotFoundError(String),
    #[error(display = "RuntimeManager: storage failure: {}.", _0)]
    StorageError(String),
    #[error(
        display = "RuntimeManager: text payload of {} bytes exceeds buffer capacity {}.",
        _0,
        _1
    )]
    CapacityError(usize, usize),
    #[error(display = "RuntimeManager: interpreter failure: {}.", _0)]
    InterpreterError(String),
    #[error(display = "RuntimeManager: nested call depth exceeds the limit of {}.", _0)]
    RecursionLimit(usize),
    #[error(display = "RuntimeManager: bad state: {}.", _0)]
    BadState(&'static str),
    #[error(display = "RuntimeManager: configuration error: {}.", _0)]
    ConfigError(String),
}

impl GatewayError {
    /// The result code reported across the boundary for this error.
    pub fn code(&self) -> u32 {
        match self {
            GatewayError::FormatError(_, _) => CODE_BAD_FORMAT,
            GatewayError::AuthenticationError => CODE_MAC_INVALID,
            GatewayError::CryptoBackendError(_) => CODE_GENERIC,
            GatewayError::BadParameters(_) => CODE_BAD_PARAMETERS,
            GatewayError::NotFoundError(_) => CODE_ITEM_NOT_FOUND,
            GatewayError::StorageError(_) => CODE_STORAGE_NOT_AVAILABLE,
            GatewayError::CapacityError(_, _) => CODE_SHORT_BUFFER,
            GatewayError::InterpreterError(_) => CODE_SCRIPT_FAILED,
            GatewayError::RecursionLimit(_) => CODE_OVERFLOW,
            GatewayError::BadState(_) => CODE_BAD_STATE,
            GatewayError::ConfigError(_) => CODE_BAD_CONFIGURATION,
        }
    }

    #[inline]
    pub fn with_origin(&self, origin: ErrorOrigin) -> ErrorCode {
        ErrorCode {
            code: self.code(),
            origin,
        }
    }
}

impl From<CryptoError> for GatewayError {
    fn from(error: CryptoError) -> Self {
        match error {
            CryptoError::FormatError(length, header) => GatewayError::FormatError(length, header),
            CryptoError::AuthenticationError => GatewayError::AuthenticationError,
            CryptoError::BackendError(primitive) => {
                GatewayError::CryptoBackendError(primitive.to_string())
            }
            CryptoError::InvalidKeyLength(_, _) => GatewayError::ConfigError(error.to_string()),
        }
    }
}

impl From<StoreError> for GatewayError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound(name) => GatewayError::NotFoundError(name),
            StoreError::InvalidName(reason) => GatewayError::BadParameters(reason),
            other => GatewayError::StorageError(other.to_string()),
        }
    }
}

impl From<EngineError> for GatewayError {
    fn from(error: EngineError) -> Self {
        match error {
            EngineError::CapacityError(length, capacity) => {
                GatewayError::CapacityError(length, capacity)
            }
            EngineError::UnknownTag(_) | EngineError::InvalidText => {
                GatewayError::BadParameters(error.to_string())
            }
            other => GatewayError::InterpreterError(other.to_string()),
        }
    }
}
