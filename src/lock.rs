// src/lock.rs

//! Cross-process exclusive lock for plugin resolution
//!
//! Every process that resolves plugins into the same plugins directory
//! serializes on `<plugins>/kiln-resolver.lock`. The lock is an advisory
//! `flock(LOCK_EX)` held through an open file handle, so it is released when
//! the guard is dropped, including during unwinding.
//!
//! # Example
//!
//! ```ignore
//! use kiln::lock::ResolverLock;
//!
//! let _lock = ResolverLock::acquire(dirs.resolver_lock_path())?;
//! // ... download, unpack, verify ...
//! // released here
//! ```

use crate::error::{Error, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Guard for the resolver lock
///
/// Hold it for as long as shared on-disk state is being modified.
#[derive(Debug)]
pub struct ResolverLock {
    file: File,
    path: PathBuf,
}

impl ResolverLock {
    /// Acquire the lock, blocking until no other holder remains
    ///
    /// The lock file and its parent directories are created if absent.
    pub fn acquire<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let lock_error = |source| Error::LockError {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(lock_error)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(lock_error)?;

        file.lock_exclusive().map_err(lock_error)?;

        debug!("Acquired resolver lock at {}", path.display());

        Ok(Self { file, path })
    }

    /// Try to acquire the lock without blocking
    ///
    /// Returns `Ok(None)` if another handle currently holds it.
    pub fn try_acquire<P: AsRef<Path>>(path: P) -> Result<Option<Self>> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                debug!("Acquired resolver lock at {}", path.display());
                Ok(Some(Self { file, path }))
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(Error::LockError { path, source: e }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ResolverLock {
    fn drop(&mut self) {
        // Closing the handle also releases the lock; unlocking explicitly
        // makes the release visible before the file is closed
        let _ = FileExt::unlock(&self.file);
        debug!("Released resolver lock at {}", self.path.display());
    }
}
