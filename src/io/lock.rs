//! Advisory scan lockfile: two scans of the same repository must not
//! interleave their merges. No cross-platform file lock crate is in
//! this workspace's dependency set, so this uses the `create_new`
//! exclusive-create idiom directly, releasing on drop.

use crate::error::CoreError;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

/// Holds an exclusive lockfile for the lifetime of the value. Dropping it
/// removes the lockfile, so a scan that panics mid-flight releases the
/// lock rather than wedging future runs (best-effort: the OS reclaims the
/// open file handle either way, but the stale `.lock` path is cleaned up
/// too when the drop runs).
pub struct ScanLock {
    path: PathBuf,
}

impl ScanLock {
    /// Acquire the lock at `path`. Fails with `CoreError::LockHeld` if
    /// another process already holds it.
    pub fn acquire(path: &Path) -> Result<Self, CoreError> {
        match OpenOptions::new().create_new(true).write(true).open(path) {
            Ok(_) => Ok(ScanLock { path: path.to_path_buf() }),
            Err(source) if source.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(CoreError::LockHeld { path: path.to_path_buf() })
            }
            Err(source) => Err(CoreError::WriteFailed { path: path.to_path_buf(), source }),
        }
    }
}

impl Drop for ScanLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn second_acquire_fails_while_first_is_held() {
        let dir = tempdir().unwrap();
        let lock_path = dir.path().join("state.json.lock");
        let first = ScanLock::acquire(&lock_path).unwrap();
        let second = ScanLock::acquire(&lock_path);
        assert!(matches!(second, Err(CoreError::LockHeld { .. })));
        drop(first);
    }

    #[test]
    fn lock_is_released_and_reacquirable_after_drop() {
        let dir = tempdir().unwrap();
        let lock_path = dir.path().join("state.json.lock");
        {
            let _first = ScanLock::acquire(&lock_path).unwrap();
        }
        let second = ScanLock::acquire(&lock_path);
        assert!(second.is_ok());
    }
}
