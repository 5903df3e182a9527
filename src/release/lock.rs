use crate::core::error::{ReleaseError, RepoError, RepoResult, ResultExt};
use fs4::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const LOCK_FILE: &str = "release.lock";

/// Exclusive lock on a package's release state, released on drop
#[derive(Debug)]
pub struct ReleaseLock {
  _file: File,
  path: PathBuf,
}

impl ReleaseLock {
  /// Take the lock in `dir`, failing with `ReleaseError::Locked` if another
  /// process holds it
  pub fn acquire(dir: &Path) -> RepoResult<Self> {
    let path = dir.join(LOCK_FILE);
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let file = OpenOptions::new()
      .create(true)
      .read(true)
      .write(true)
      .truncate(true)
      .open(&path)
      .with_context(|| format!("Failed to open {}", path.display()))?;

    match file.try_lock_exclusive() {
      Ok(()) => {
        tracing::debug!("Acquired release lock {}", path.display());
        Ok(Self { _file: file, path })
      }
      Err(err) if err.kind() == ErrorKind::WouldBlock => Err(RepoError::Release(ReleaseError::Locked { path })),
      #[cfg(windows)]
      Err(err) if matches!(err.raw_os_error(), Some(32 | 33)) => {
        Err(RepoError::Release(ReleaseError::Locked { path }))
      }
      Err(err) => Err(RepoError::from(err).context(format!("Failed to lock {}", path.display()))),
    }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }
}
