//! Secure named-script storage
//!
//! Scripts are persisted verbatim under their name in the platform's
//! key/value object store.  The platform store is consumed through the
//! `ObjectStorage` capability; `ScriptStore` layers create-or-overwrite and
//! read-back semantics on top of it.
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
pub mod storage;
mod store;

pub use error::StoreError;
pub use storage::{FileObjectStorage, MemoryObjectStorage, ObjectStorage};
pub use store::{ScriptRecord, ScriptStore, DEFAULT_MAX_NAME_LEN};
