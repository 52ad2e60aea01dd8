//! Payload crypto errors
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

/// The various error modes of verifying, decrypting and sealing payloads.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The payload is too short to hold the fixed-size header.
    #[error(
        display = "CryptoError: payload of {} bytes is shorter than the {}-byte header.",
        _0,
        _1
    )]
    FormatError(usize, usize),
    /// The attached MAC does not match the authenticated region.
    #[error(display = "CryptoError: MAC verification failed.")]
    AuthenticationError,
    /// A primitive rejected its input (key or IV of the wrong size, or a
    /// derivation that could not produce the requested length).
    #[error(display = "CryptoError: crypto backend failure in {}.", _0)]
    BackendError(&'static str),
    /// Key material of the wrong length was supplied.
    #[error(display = "CryptoError: expected a {}-byte key, got {} bytes.", _0, _1)]
    InvalidKeyLength(usize, usize),
}
