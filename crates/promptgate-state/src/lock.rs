//! Cross-process exclusive lock on a snapshot file.
//!
//! The lock is a `<state>.lock` sibling created with `create_new`, so only
//! one process can hold it. It is removed when the guard drops.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::StorageError;
use crate::snapshot::sibling;
use crate::storage_traits::StorageResult;

const RETRY_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug)]
pub struct StateLock {
    path: PathBuf,
}

impl StateLock {
    /// Take the lock for `state`, retrying for up to `wait` while another
    /// holder has it.
    pub fn acquire(state: &Path, wait: Duration) -> StorageResult<Self> {
        if let Some(parent) = state.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let path = sibling(state, "lock");
        let deadline = Instant::now() + wait;
        loop {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    let _ = writeln!(file, "pid={}", std::process::id());
                    debug!(path = %path.display(), "state lock acquired");
                    return Ok(Self { path });
                }
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                    if Instant::now() >= deadline {
                        return Err(StorageError::Locked {
                            path: path.display().to_string(),
                        });
                    }
                    std::thread::sleep(RETRY_INTERVAL);
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}
