//! Runtime configuration
//!
//! The gateway is configured once, at start-up, from a JSON document:
//!
//! ```json
//! {
//!     "master_key": "<64 hex digits>",
//!     "buffer_capacity": 8192,
//!     "max_call_depth": 8,
//!     "max_name_len": 64,
//!     "storage_root": "/var/lib/script-gateway"
//! }
//! ```
//!
//! Only `master_key` is mandatory.  The configuration is consumed to build
//! the `DispatcherContext`; nothing is kept in process-wide state.
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
use log::info;
use payload_crypto::MasterSecret;
use script_engine::DEFAULT_BUFFER_CAPACITY;
use script_store::DEFAULT_MAX_NAME_LEN;
use serde::{de, Deserialize, Deserializer};
use std::path::{Path, PathBuf};

/// Default bound on nested `internal_TA_call` invocations.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 8;

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    #[serde(deserialize_with = "deserialize_master_key")]
    master_key: MasterSecret,
    #[serde(default = "default_buffer_capacity")]
    buffer_capacity: usize,
    #[serde(default = "default_max_call_depth")]
    max_call_depth: usize,
    #[serde(default = "default_max_name_len")]
    max_name_len: usize,
    #[serde(default)]
    storage_root: Option<PathBuf>,
}

fn default_buffer_capacity() -> usize {
    DEFAULT_BUFFER_CAPACITY
}

fn default_max_call_depth() -> usize {
    DEFAULT_MAX_CALL_DEPTH
}

fn default_max_name_len() -> usize {
    DEFAULT_MAX_NAME_LEN
}

fn deserialize_master_key<'de, D>(deserializer: D) -> Result<MasterSecret, D::Error>
where
    D: Deserializer<'de>,
{
    let encoded = String::deserialize(deserializer)?;
    let bytes = hex::decode(encoded.trim()).map_err(de::Error::custom)?;
    MasterSecret::from_slice(&bytes).map_err(de::Error::custom)
}

impl GatewayConfig {
    /// Parses and validates a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self, GatewayError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| GatewayError::ConfigError(e.to_string()))?;
        config.assert_valid()?;
        info!(
            "Loaded gateway configuration: buffer capacity {}, call depth {}, name length {}",
            config.buffer_capacity, config.max_call_depth, config.max_name_len
        );
        Ok(config)
    }

    /// A configuration with every optional field at its default.
    pub fn new(master_key: MasterSecret) -> Self {
        GatewayConfig {
            master_key,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            max_name_len: DEFAULT_MAX_NAME_LEN,
            storage_root: None,
        }
    }

    fn assert_valid(&self) -> Result<(), GatewayError> {
        if self.buffer_capacity == 0 {
            return Err(GatewayError::ConfigError(String::from(
                "buffer_capacity must be positive",
            )));
        }
        if self.max_name_len == 0 {
            return Err(GatewayError::ConfigError(String::from(
                "max_name_len must be positive",
            )));
        }
        Ok(())
    }

    #[inline]
    pub fn master_key(&self) -> &MasterSecret {
        &self.master_key
    }

    #[inline]
    pub fn buffer_capacity(&self) -> usize {
        self.buffer_capacity
    }

    #[inline]
    pub fn max_call_depth(&self) -> usize {
        self.max_call_depth
    }

    #[inline]
    pub fn max_name_len(&self) -> usize {
        self.max_name_len
    }

    #[inline]
    pub fn storage_root(&self) -> Option<&Path> {
        self.storage_root.as_deref()
    }

    pub fn set_buffer_capacity(&mut self, capacity: usize) -> &mut Self {
        self.buffer_capacity = capacity;
        self
    }

    pub fn set_max_call_depth(&mut self, depth: usize) -> &mut Self {
        self.max_call_depth = depth;
        self
    }

    pub fn set_storage_root<T: AsRef<Path>>(&mut self, root: T) -> &mut Self {
        self.storage_root = Some(root.as_ref().to_path_buf());
        self
    }
}
