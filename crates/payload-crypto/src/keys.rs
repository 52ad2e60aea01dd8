//! Master secret and per-payload key derivation.
//!
//! ## Authors
//!
//! The Script Gateway Development Team.
//!
//! ## Licensing and copyright notice
//!
//! See the `LICENSE.md` file in the Script Gateway root directory for
//! information on licensing and copyright.

use crate::error::CryptoError;
use hkdf::Hkdf;
use sha2::Sha512;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Length of the provisioned master secret, in bytes.
pub const MASTER_KEY_LEN: usize = 32;
/// Length of each derived subkey, in bytes.
pub(crate) const SUBKEY_LEN: usize = 32;
/// HKDF output length: one cipher key followed by one MAC key.
const DERIVED_KEY_MATERIAL_LEN: usize = 2 * SUBKEY_LEN;

/// The fixed 256-bit symmetric secret provisioned into the trusted domain.
/// It never leaves the trusted domain and is wiped when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterSecret([u8; MASTER_KEY_LEN]);

impl MasterSecret {
    #[inline]
    pub fn from_bytes(bytes: [u8; MASTER_KEY_LEN]) -> Self {
        MasterSecret(bytes)
    }

    /// Builds a master secret from a slice, which must be exactly
    /// `MASTER_KEY_LEN` bytes long.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != MASTER_KEY_LEN {
            return Err(CryptoError::InvalidKeyLength(MASTER_KEY_LEN, bytes.len()));
        }
        let mut key = [0u8; MASTER_KEY_LEN];
        key.copy_from_slice(bytes);
        Ok(MasterSecret(key))
    }

    #[inline]
    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for MasterSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterSecret(<redacted>)")
    }
}

/// Subkeys derived for exactly one payload.  Never cached or persisted.
#[derive(Zeroize, ZeroizeOnDrop)]
pub(crate) struct DerivedKeyMaterial {
    /// Bytes `[0, 32)` of the HKDF output.
    pub(crate) cipher_key: [u8; SUBKEY_LEN],
    /// Bytes `[32, 64)` of the HKDF output.
    pub(crate) mac_key: [u8; SUBKEY_LEN],
}

impl DerivedKeyMaterial {
    /// HKDF-SHA512 keyed by `secret`, salted with `salt`, empty info string.
    pub(crate) fn derive(secret: &MasterSecret, salt: &[u8]) -> Result<Self, CryptoError> {
        let hkdf = Hkdf::<Sha512>::new(Some(salt), secret.as_bytes());
        let mut okm = Zeroizing::new([0u8; DERIVED_KEY_MATERIAL_LEN]);
        hkdf.expand(&[], &mut okm[..])
            .map_err(|_| CryptoError::BackendError("HKDF-SHA512 expand"))?;

        let mut keys = DerivedKeyMaterial {
            cipher_key: [0u8; SUBKEY_LEN],
            mac_key: [0u8; SUBKEY_LEN],
        };
        keys.cipher_key.copy_from_slice(&okm[..SUBKEY_LEN]);
        keys.mac_key.copy_from_slice(&okm[SUBKEY_LEN..]);
        Ok(keys)
    }
}
