//! The platform object-storage capability and its implementations.
//!
//! Object ids are opaque byte strings, as with a trusted OS's persistent
//! object store.  `write` appends to an object created by `create`, and
//! `rename` replaces the target object in one step.
//!
//! ## Authors
//!
//! The Script Gateway Development Team.
//!
//! ## Licensing and copyright notice
//!
//! See the `LICENSE.md` file in the Script Gateway root directory for
//! information on licensing and copyright.

use crate::error::StoreError;
use log::debug;
use std::{
    collections::HashMap,
    fs::{self, File, OpenOptions},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    sync::Mutex,
};

////////////////////////////////////////////////////////////////////////////////
// The capability.
////////////////////////////////////////////////////////////////////////////////

/// Key/value object storage supplied by the platform.
pub trait ObjectStorage: Send + Sync {
    /// Creates an empty object under `id`, truncating any existing object.
    fn create(&self, id: &[u8]) -> Result<(), StoreError>;
    /// Appends `data` to the existing object `id`.
    fn write(&self, id: &[u8], data: &[u8]) -> Result<(), StoreError>;
    /// Reads the whole object, or `None` if no object exists under `id`.
    fn open_read(&self, id: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;
    /// Moves object `from` to `to`, replacing any object already at `to`.
    fn rename(&self, from: &[u8], to: &[u8]) -> Result<(), StoreError>;
    /// Deletes object `id`.  Deleting a missing object is not an error.
    fn delete(&self, id: &[u8]) -> Result<(), StoreError>;
}

////////////////////////////////////////////////////////////////////////////////
// In-memory storage.
////////////////////////////////////////////////////////////////////////////////

/// Object storage held in trusted memory, lost when the runtime exits.
#[derive(Debug, Default)]
pub struct MemoryObjectStorage {
    objects: Mutex<HashMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryObjectStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_objects<T>(
        &self,
        f: impl FnOnce(&mut HashMap<Vec<u8>, Vec<u8>>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut objects = self
            .objects
            .lock()
            .map_err(|_| StoreError::LockError("memory object table"))?;
        f(&mut objects)
    }
}

impl ObjectStorage for MemoryObjectStorage {
    fn create(&self, id: &[u8]) -> Result<(), StoreError> {
        self.with_objects(|objects| {
            objects.insert(id.to_vec(), Vec::new());
            Ok(())
        })
    }

    fn write(&self, id: &[u8], data: &[u8]) -> Result<(), StoreError> {
        self.with_objects(|objects| {
            objects
                .get_mut(id)
                .ok_or_else(|| StoreError::NotFound(hex::encode(id)))?
                .extend_from_slice(data);
            Ok(())
        })
    }

    fn open_read(&self, id: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        self.with_objects(|objects| Ok(objects.get(id).cloned()))
    }

    fn rename(&self, from: &[u8], to: &[u8]) -> Result<(), StoreError> {
        self.with_objects(|objects| {
            let data = objects
                .remove(from)
                .ok_or_else(|| StoreError::NotFound(hex::encode(from)))?;
            objects.insert(to.to_vec(), data);
            Ok(())
        })
    }

    fn delete(&self, id: &[u8]) -> Result<(), StoreError> {
        self.with_objects(|objects| {
            objects.remove(id);
            Ok(())
        })
    }
}

////////////////////////////////////////////////////////////////////////////////
// File-backed storage.
////////////////////////////////////////////////////////////////////////////////

/// Object storage with one file per object under a root directory.  File
/// names are the hex encoding of the object id.
#[derive(Clone, Debug)]
pub struct FileObjectStorage {
    root: PathBuf,
}

impl FileObjectStorage {
    /// Opens (creating if necessary) the storage directory `root`.
    pub fn new<T: AsRef<Path>>(root: T) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        if !root.try_exists().map_err(StoreError::IoError)? {
            fs::create_dir_all(&root).map_err(StoreError::IoError)?;
        }
        debug!("FileObjectStorage rooted at {:?}", root);
        Ok(FileObjectStorage { root })
    }

    #[inline]
    fn object_path(&self, id: &[u8]) -> PathBuf {
        self.root.join(hex::encode(id))
    }
}

impl ObjectStorage for FileObjectStorage {
    fn create(&self, id: &[u8]) -> Result<(), StoreError> {
        File::create(self.object_path(id)).map_err(StoreError::IoError)?;
        Ok(())
    }

    fn write(&self, id: &[u8], data: &[u8]) -> Result<(), StoreError> {
        let mut file = match OpenOptions::new().append(true).open(self.object_path(id)) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound(hex::encode(id)))
            }
            Err(err) => return Err(StoreError::IoError(err)),
        };
        file.write_all(data).map_err(StoreError::IoError)?;
        file.sync_all().map_err(StoreError::IoError)
    }

    fn open_read(&self, id: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        match fs::read(self.object_path(id)) {
            Ok(data) => Ok(Some(data)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StoreError::IoError(err)),
        }
    }

    fn rename(&self, from: &[u8], to: &[u8]) -> Result<(), StoreError> {
        match fs::rename(self.object_path(from), self.object_path(to)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(StoreError::NotFound(hex::encode(from)))
            }
            Err(err) => Err(StoreError::IoError(err)),
        }
    }

    fn delete(&self, id: &[u8]) -> Result<(), StoreError> {
        match fs::remove_file(self.object_path(id)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StoreError::IoError(err)),
        }
    }
}
