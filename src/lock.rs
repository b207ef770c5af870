//! File locking and atomic replacement for the task files.
//!
//! The store keeps no locks of its own. CLI mutations acquire one
//! `FileLock` on the sibling `.lock` file and hold it across the whole
//! load-mutate-save sequence, so parallel agents queue instead of
//! interleaving. Waiters retry every 50 ms until the configured deadline,
//! then surface `Error::LockTimeout`.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use fs2::FileExt;

use crate::error::{Error, Result};

/// Default wait for the store lock, in milliseconds
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5000;

const RETRY_INTERVAL: Duration = Duration::from_millis(50);

/// Exclusive lock on a file, released on drop
pub struct FileLock {
    file: File,
}

impl FileLock {
    /// Lock `path` exclusively, creating the file (and parent directories)
    /// if needed. Waits up to `timeout_ms` for another holder to let go.
    pub fn acquire(path: impl AsRef<Path>, timeout_ms: u64) -> Result<Self> {
        let path = path.as_ref();
        let file = open_lock_file(path)?;
        let timeout = Duration::from_millis(timeout_ms);
        let start = Instant::now();

        loop {
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(FileLock { file }),
                Err(err) if is_contention(&err) => {
                    if start.elapsed() >= timeout {
                        return Err(Error::LockTimeout(path.to_path_buf()));
                    }
                    tracing::debug!(path = %path.display(), "lock busy, retrying");
                    std::thread::sleep(RETRY_INTERVAL);
                }
                Err(err) => return Err(Error::Io(err)),
            }
        }
    }

    /// Single attempt. `Ok(None)` means another process holds the lock.
    pub fn try_acquire(path: impl AsRef<Path>) -> Result<Option<Self>> {
        let file = open_lock_file(path.as_ref())?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(FileLock { file })),
            Err(err) if is_contention(&err) => Ok(None),
            Err(err) => Err(Error::Io(err)),
        }
    }

    /// The locked handle itself, for commit strategies that write through
    /// it instead of renaming over the path.
    pub fn file_mut(&mut self) -> &mut File {
        &mut self.file
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

fn open_lock_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;
    Ok(file)
}

fn is_contention(err: &io::Error) -> bool {
    if err.kind() == io::ErrorKind::WouldBlock {
        return true;
    }
    // Windows reports held locks as sharing violations (os errors 32/33)
    // rather than WouldBlock
    cfg!(windows) && matches!(err.raw_os_error(), Some(32) | Some(33))
}

/// Replace the contents of `path` atomically.
///
/// Writes a sibling temp file named with this process id, syncs it, then
/// renames it over the destination. A reader observes either the old bytes
/// or the new bytes, never a partial write.
pub fn write_atomic(path: impl AsRef<Path>, data: &[u8]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let temp_path = path.with_extension(format!("{ext}.tmp.{}", std::process::id()));

    let mut temp = File::create(&temp_path)?;
    temp.write_all(data)?;
    temp.sync_all()?;
    drop(temp);

    if let Err(err) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(err.into());
    }

    Ok(())
}

pub fn write_atomic_str(path: impl AsRef<Path>, data: &str) -> Result<()> {
    write_atomic(path, data.as_bytes())
}
