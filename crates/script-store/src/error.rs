//! Script store errors
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

/// The various error modes of the script store and the object storage
/// underneath it.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record or object exists under the given name.
    #[error(display = "StoreError: no object named {:?}.", _0)]
    NotFound(String),
    /// The name is empty, too long or not UTF-8.
    #[error(display = "StoreError: invalid script name: {}.", _0)]
    InvalidName(String),
    /// The filesystem backing the object store failed.
    #[error(display = "StoreError: IO error: {:?}.", _0)]
    IoError(#[error(source)] std::io::Error),
    /// Failed to obtain the lock on an in-memory object table.
    #[error(display = "StoreError: failed to obtain lock on {}.", _0)]
    LockError(&'static str),
    /// Any other failure reported by a platform object store.
    #[error(display = "StoreError: object storage failure: {}.", _0)]
    BackendError(String),
}
