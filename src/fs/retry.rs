// src/fs/retry.rs

//! Retrying file operator.
//!
//! The helper and target processes may hold transient locks on files being
//! replaced; short retry loops absorb this without hard failure. Copy and
//! delete each attempt the operation up to `attempts` times with `delay`
//! between attempts, then surface the last underlying error as
//! [`DumprunError::LockedOrPermission`].

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::errors::{DumprunError, Result};
use crate::fs::FileSystem;

/// Retry policy for file operations.
#[derive(Debug, Clone, Copy)]
pub struct RetrySettings {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

/// File operations with bounded retries.
#[derive(Debug, Clone)]
pub struct FileOps {
    fs: Arc<dyn FileSystem>,
    retry: RetrySettings,
}

impl FileOps {
    pub fn new(fs: Arc<dyn FileSystem>, retry: RetrySettings) -> Self {
        Self { fs, retry }
    }

    pub fn fs(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    /// Copy `src` over `dst`, overwriting and creating parent directories.
    ///
    /// `src` must exist. Returns `LockedOrPermission` once attempts are
    /// exhausted.
    pub async fn copy(&self, src: &Path, dst: &Path) -> Result<()> {
        if !self.fs.is_file(src) {
            return Err(DumprunError::NotFound(format!("{:?}", src)));
        }

        let mut attempt = 1;
        loop {
            match self.fs.copy(src, dst) {
                Ok(()) => {
                    debug!(?src, ?dst, attempt, "copied file");
                    return Ok(());
                }
                Err(err) if attempt >= self.retry.attempts => {
                    return Err(DumprunError::LockedOrPermission {
                        op: "copy to",
                        path: dst.to_path_buf(),
                        source: err,
                    });
                }
                Err(err) => {
                    warn!(?dst, attempt, error = %err, "copy failed; retrying");
                    attempt += 1;
                    sleep(self.retry.delay).await;
                }
            }
        }
    }

    /// Delete `path` if it exists. A missing file counts as success.
    pub async fn delete(&self, path: &Path) -> Result<()> {
        let mut attempt = 1;
        loop {
            if !self.fs.exists(path) {
                return Ok(());
            }
            match self.fs.remove_file(path) {
                Ok(()) => {
                    debug!(?path, attempt, "deleted file");
                    return Ok(());
                }
                Err(err) if attempt >= self.retry.attempts => {
                    return Err(DumprunError::LockedOrPermission {
                        op: "delete",
                        path: path.to_path_buf(),
                        source: err,
                    });
                }
                Err(err) => {
                    warn!(?path, attempt, error = %err, "delete failed; retrying");
                    attempt += 1;
                    sleep(self.retry.delay).await;
                }
            }
        }
    }

    /// Delete `dst` then copy `src` over it.
    ///
    /// A failed pre-copy delete is logged as degraded but does not abort
    /// the copy attempt; proceeding is preferred over stalling.
    pub async fn replace(&self, src: &Path, dst: &Path) -> Result<()> {
        if let Err(err) = self.delete(dst).await {
            warn!(?dst, error = %err, "could not remove existing file; attempting copy anyway");
        }
        self.copy(src, dst).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use std::path::PathBuf;

    fn fast_ops(fs: &MockFileSystem) -> FileOps {
        FileOps::new(
            Arc::new(fs.clone()),
            RetrySettings {
                attempts: 3,
                delay: Duration::from_millis(1),
            },
        )
    }

    #[tokio::test]
    async fn delete_of_missing_file_succeeds() {
        let fs = MockFileSystem::new();
        let ops = fast_ops(&fs);
        ops.delete(&PathBuf::from("/nope.bin")).await.unwrap();
    }

    #[tokio::test]
    async fn copy_of_missing_source_is_not_found() {
        let fs = MockFileSystem::new();
        let ops = fast_ops(&fs);
        let err = ops
            .copy(&PathBuf::from("/nope.bin"), &PathBuf::from("/dst.bin"))
            .await
            .unwrap_err();
        assert!(matches!(err, DumprunError::NotFound(_)));
    }

    #[tokio::test]
    async fn replace_proceeds_past_failed_delete() {
        let fs = MockFileSystem::new();
        fs.add_file("/src.bin", b"new".to_vec());
        fs.add_file("/dst.bin", b"old".to_vec());
        // Delete always fails, copy (overwrite) succeeds.
        fs.lock_for("/dst.bin", 3);

        let ops = fast_ops(&fs);
        ops.replace(&PathBuf::from("/src.bin"), &PathBuf::from("/dst.bin"))
            .await
            .unwrap();
        assert_eq!(fs.read(&PathBuf::from("/dst.bin")).unwrap(), b"new");
    }
}
