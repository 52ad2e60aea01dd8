//! The sealed payload format, verification and decryption.
//!
//! ## Authors
//!
//! The Script Gateway Development Team.
//!
//! ## Licensing and copyright notice
//!
//! See the `LICENSE.md` file in the Script Gateway root directory for
//! information on licensing and copyright.

use crate::{
    error::CryptoError,
    keys::{DerivedKeyMaterial, MasterSecret},
};
use ctr::cipher::{KeyIvInit, StreamCipher};
use hmac::{Hmac, Mac};
use log::{debug, error};
use rand::{rngs::OsRng, RngCore};
use sha2::Sha512;

/// Length of the HKDF salt at the head of a payload.
pub const SALT_LEN: usize = 16;
/// Length of the HMAC-SHA512 tag.
pub const MAC_LEN: usize = 64;
/// Length of the CTR nonce, i.e. the high half of the counter block.
pub const NONCE_LEN: usize = 8;
/// Smallest well-formed payload: a header with an empty ciphertext.
pub const HEADER_LEN: usize = SALT_LEN + MAC_LEN + NONCE_LEN;

const COUNTER_BLOCK_LEN: usize = 16;

type Aes256Ctr = ctr::Ctr128BE<aes::Aes256>;
type HmacSha512 = Hmac<Sha512>;

/// A borrowed, split view of a sealed payload.
#[derive(Clone, Copy, Debug)]
pub struct EncryptedPayload<'a> {
    pub salt: &'a [u8],
    pub mac: &'a [u8],
    pub nonce: &'a [u8],
    pub ciphertext: &'a [u8],
    /// `nonce || ciphertext`, the region covered by the MAC.
    authenticated: &'a [u8],
}

impl<'a> EncryptedPayload<'a> {
    /// Splits `bytes` along the fixed layout.  Anything shorter than
    /// `HEADER_LEN` is malformed.
    pub fn parse(bytes: &'a [u8]) -> Result<Self, CryptoError> {
        if bytes.len() < HEADER_LEN {
            return Err(CryptoError::FormatError(bytes.len(), HEADER_LEN));
        }
        let (salt, rest) = bytes.split_at(SALT_LEN);
        let (mac, authenticated) = rest.split_at(MAC_LEN);
        let (nonce, ciphertext) = authenticated.split_at(NONCE_LEN);
        Ok(EncryptedPayload {
            salt,
            mac,
            nonce,
            ciphertext,
            authenticated,
        })
    }
}

/// Verifies the MAC of `payload` and, only if it matches, decrypts the
/// ciphertext and returns the plaintext script.
pub fn verify_and_decrypt(secret: &MasterSecret, payload: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let payload = EncryptedPayload::parse(payload)?;
    let keys = DerivedKeyMaterial::derive(secret, payload.salt)?;

    let mut mac = new_mac(&keys)?;
    mac.update(payload.authenticated);
    // `verify_slice` checks the tag length and compares in constant time.
    if mac.verify_slice(payload.mac).is_err() {
        error!("verify_and_decrypt: MAC did not match the data");
        return Err(CryptoError::AuthenticationError);
    }

    let mut plaintext = payload.ciphertext.to_vec();
    apply_keystream(&keys, payload.nonce, &mut plaintext)?;
    debug!("verify_and_decrypt: recovered {} plaintext bytes", plaintext.len());
    Ok(plaintext)
}

/// Producer side: encrypts `plaintext` under subkeys derived from `salt` and
/// lays the result out as a sealed payload.
pub fn seal(
    secret: &MasterSecret,
    salt: &[u8; SALT_LEN],
    nonce: &[u8; NONCE_LEN],
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let keys = DerivedKeyMaterial::derive(secret, salt)?;

    let mut payload = Vec::with_capacity(HEADER_LEN + plaintext.len());
    payload.extend_from_slice(salt);
    payload.resize(SALT_LEN + MAC_LEN, 0);
    payload.extend_from_slice(nonce);
    payload.extend_from_slice(plaintext);
    apply_keystream(&keys, nonce, &mut payload[HEADER_LEN..])?;

    let mut mac = new_mac(&keys)?;
    mac.update(&payload[SALT_LEN + MAC_LEN..]);
    let tag = mac.finalize().into_bytes();
    payload[SALT_LEN..SALT_LEN + MAC_LEN].copy_from_slice(&tag);
    Ok(payload)
}

/// As `seal`, with a fresh salt and nonce from the operating system RNG.
pub fn seal_random(secret: &MasterSecret, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let mut salt = [0u8; SALT_LEN];
    let mut nonce = [0u8; NONCE_LEN];
    OsRng
        .try_fill_bytes(&mut salt)
        .map_err(|_| CryptoError::BackendError("OS random number generator"))?;
    OsRng
        .try_fill_bytes(&mut nonce)
        .map_err(|_| CryptoError::BackendError("OS random number generator"))?;
    seal(secret, &salt, &nonce, plaintext)
}

fn new_mac(keys: &DerivedKeyMaterial) -> Result<HmacSha512, CryptoError> {
    <HmacSha512 as Mac>::new_from_slice(&keys.mac_key)
        .map_err(|_| CryptoError::BackendError("HMAC-SHA512 key setup"))
}

/// AES-256-CTR.  The counter block is `nonce || 0^64`, so the nonce occupies
/// the high-order half and the counter starts at zero.
fn apply_keystream(
    keys: &DerivedKeyMaterial,
    nonce: &[u8],
    buffer: &mut [u8],
) -> Result<(), CryptoError> {
    let mut counter_block = [0u8; COUNTER_BLOCK_LEN];
    counter_block[..NONCE_LEN].copy_from_slice(nonce);
    let mut cipher = Aes256Ctr::new_from_slices(&keys.cipher_key, &counter_block)
        .map_err(|_| CryptoError::BackendError("AES-256-CTR key setup"))?;
    cipher
        .try_apply_keystream(buffer)
        .map_err(|_| CryptoError::BackendError("AES-256-CTR keystream"))
}
