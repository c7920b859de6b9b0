//! # Data Directory Locking
//!
//! Prevents two node processes from writing the same data directory.
//! Uses `fs2` for cross-platform file locking (flock on Unix, LockFile on Windows).

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use shared_types::StorageError;

use crate::StorageResult;

/// Exclusive lock on a data directory, released on drop.
pub struct DatabaseLock {
    /// Kept open to hold the lock.
    file: File,
    path: PathBuf,
    pid: u32,
}

impl DatabaseLock {
    const LOCK_FILE: &'static str = "LOCK";

    /// Acquire the lock without blocking.
    ///
    /// # Errors
    ///
    /// `StorageError::Locked` if another handle or process holds it.
    pub fn acquire(data_dir: &Path) -> StorageResult<Self> {
        std::fs::create_dir_all(data_dir)?;
        let lock_path = data_dir.join(Self::LOCK_FILE);

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)?;

        if file.try_lock_exclusive().is_err() {
            let holder = Self::read_existing_pid(&lock_path)
                .map(|p| format!("process {p}"))
                .unwrap_or_else(|| "unknown holder".to_string());
            return Err(StorageError::Locked(format!(
                "{} held by {holder}",
                lock_path.display()
            )));
        }

        let pid = std::process::id();
        file.set_len(0)?;
        let mut locked = file;
        writeln!(locked, "{pid}")?;
        locked.sync_all()?;

        tracing::debug!("[lc-02] acquired data directory lock {}", lock_path.display());
        Ok(Self {
            file: locked,
            path: lock_path,
            pid,
        })
    }

    /// PID of the holding process.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_existing_pid(path: &Path) -> Option<u32> {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|s| s.trim().parse().ok())
    }
}

impl Drop for DatabaseLock {
    fn drop(&mut self) {
        #[allow(clippy::incompatible_msrv)]
        let _ = self.file.unlock();
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_fails_until_drop() {
        let dir = tempfile::tempdir().unwrap();
        let first = DatabaseLock::acquire(dir.path()).unwrap();
        assert_eq!(first.pid(), std::process::id());

        let second = DatabaseLock::acquire(dir.path());
        assert!(matches!(second, Err(StorageError::Locked(_))));

        drop(first);
        assert!(DatabaseLock::acquire(dir.path()).is_ok());
    }
}
