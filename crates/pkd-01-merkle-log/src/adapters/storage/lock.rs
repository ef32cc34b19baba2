//! # Store Lock
//!
//! Exclusive advisory lock beside the store file, taken with `fs2` (flock on
//! Unix, LockFile on Windows). The holder's PID is written into the lock file
//! for the error a second opener sees.

use crate::domain::errors::KVStoreError;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Held for as long as a store is open; released on drop.
pub struct StoreLock {
    file: File,
    path: PathBuf,
    pid: u32,
}

impl StoreLock {
    /// Lock file for the store at `store_path`.
    pub fn path_for(store_path: &Path) -> PathBuf {
        let mut name = store_path.as_os_str().to_os_string();
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Take the lock for `store_path` without waiting.
    pub fn acquire(store_path: &Path) -> Result<Self, KVStoreError> {
        let path = Self::path_for(store_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(lock_io)?;
        }

        // Truncated only once locked, so a holder's PID stays readable.
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(lock_io)?;

        if file.try_lock_exclusive().is_err() {
            return Err(KVStoreError::AlreadyLocked {
                path: path.display().to_string(),
                pid: Self::read_existing_pid(&path),
            });
        }

        let pid = std::process::id();
        file.set_len(0).map_err(lock_io)?;
        file.seek(SeekFrom::Start(0)).map_err(lock_io)?;
        writeln!(file, "{pid}").map_err(lock_io)?;
        file.sync_all().map_err(lock_io)?;

        Ok(Self { file, path, pid })
    }

    /// PID written into the lock file.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Path of the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_existing_pid(path: &Path) -> Option<u32> {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|s| s.trim().parse().ok())
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        // The lock file stays on disk; only the lock is released.
        let _ = FileExt::unlock(&self.file);
    }
}

fn lock_io(e: std::io::Error) -> KVStoreError {
    KVStoreError::IOError {
        message: format!("store lock: {e}"),
    }
}
