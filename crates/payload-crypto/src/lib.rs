//! Authenticated decryption of sealed script payloads
//!
//! A sealed payload travels from the untrusted side as a single byte buffer
//! laid out as
//!
//! ```text
//! [salt:16][mac:64][nonce:8][ciphertext:N]
//! ```
//!
//! Two 256-bit subkeys are derived per payload with HKDF-SHA512 from the
//! provisioned master secret and the payload's salt.  The first subkey drives
//! AES-256 in counter mode, the second HMAC-SHA512 over `nonce || ciphertext`.
//! The MAC is always verified before any byte is decrypted.
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
mod keys;
mod payload;

pub use error::CryptoError;
pub use keys::{MasterSecret, MASTER_KEY_LEN};
pub use payload::{
    seal, seal_random, verify_and_decrypt, EncryptedPayload, HEADER_LEN, MAC_LEN, NONCE_LEN,
    SALT_LEN,
};
