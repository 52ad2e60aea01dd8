//! The named script store.
//!
//! Scripts are kept as plaintext bodies keyed by name; the store itself
//! adds no protection at rest beyond what the platform storage offers.
//! Each save is staged under its own scratch object and renamed over the
//! live record only once the whole body has been written, so a failed save
//! leaves the previous record (or the absence of one) untouched and
//! concurrent saves of one name never share a scratch object.
//!
//! ## Authors
//!
//! The Script Gateway Development Team.
//!
//! ## Licensing and copyright notice
//!
//! See the `LICENSE.md` file in the Script Gateway root directory for
//! information on licensing and copyright.

use crate::{error::StoreError, storage::ObjectStorage};
use log::{debug, error, info};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

/// Default upper bound on the length of a script name, in bytes.
pub const DEFAULT_MAX_NAME_LEN: usize = 64;

const RECORD_PREFIX: &[u8] = b"script:";
const STAGING_PREFIX: &[u8] = b"staging:";

/// Distinguishes the scratch objects of saves in flight.
static NEXT_STAGING_ID: AtomicU64 = AtomicU64::new(0);

/// A stored script: its name and its plaintext body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptRecord {
    pub name: String,
    pub body: Vec<u8>,
}

/// Name-indexed persistence of script bodies.
#[derive(Clone)]
pub struct ScriptStore {
    storage: Arc<dyn ObjectStorage>,
    max_name_len: usize,
}

impl ScriptStore {
    pub fn new(storage: Arc<dyn ObjectStorage>) -> Self {
        Self::with_max_name_len(storage, DEFAULT_MAX_NAME_LEN)
    }

    pub fn with_max_name_len(storage: Arc<dyn ObjectStorage>, max_name_len: usize) -> Self {
        ScriptStore {
            storage,
            max_name_len,
        }
    }

    #[inline]
    pub fn max_name_len(&self) -> usize {
        self.max_name_len
    }

    /// Checks that `name` is non-empty UTF-8 no longer than the configured
    /// bound, returning it as a string slice.
    pub fn validate_name<'a>(&self, name: &'a [u8]) -> Result<&'a str, StoreError> {
        if name.is_empty() || name.len() > self.max_name_len {
            return Err(StoreError::InvalidName(format!(
                "name length {} outside 1..={}",
                name.len(),
                self.max_name_len
            )));
        }
        std::str::from_utf8(name)
            .map_err(|_| StoreError::InvalidName(String::from("name is not valid UTF-8")))
    }

    /// Stores `body` under `name`, replacing any previous record.
    pub fn save(&self, name: &[u8], body: &[u8]) -> Result<(), StoreError> {
        let name = self.validate_name(name)?;
        let staging = staging_id(name);
        let record = object_id(RECORD_PREFIX, name);

        let staged = self
            .storage
            .create(&staging)
            .and_then(|_| self.storage.write(&staging, body))
            .and_then(|_| self.storage.rename(&staging, &record));

        if let Err(err) = staged {
            error!("Failed to save script {:?}: {}", name, err);
            if let Err(cleanup) = self.storage.delete(&staging) {
                error!("Failed to discard staged script {:?}: {}", name, cleanup);
            }
            return Err(err);
        }

        info!("Saved script {:?} ({} bytes)", name, body.len());
        Ok(())
    }

    /// Fetches the record stored under `name`.
    pub fn load(&self, name: &[u8]) -> Result<ScriptRecord, StoreError> {
        let name = self.validate_name(name)?;
        match self.storage.open_read(&object_id(RECORD_PREFIX, name))? {
            Some(body) => {
                debug!("Loaded script {:?} ({} bytes)", name, body.len());
                Ok(ScriptRecord {
                    name: name.to_string(),
                    body,
                })
            }
            None => Err(StoreError::NotFound(name.to_string())),
        }
    }
}

fn object_id(prefix: &[u8], name: &str) -> Vec<u8> {
    let mut id = Vec::with_capacity(prefix.len() + name.len());
    id.extend_from_slice(prefix);
    id.extend_from_slice(name.as_bytes());
    id
}

fn staging_id(name: &str) -> Vec<u8> {
    let serial = NEXT_STAGING_ID.fetch_add(1, Ordering::Relaxed);
    let mut prefix = STAGING_PREFIX.to_vec();
    prefix.extend_from_slice(format!("{}:", serial).as_bytes());
    object_id(&prefix, name)
}
