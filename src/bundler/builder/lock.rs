//! Exclusive ownership of a build directory for one run.

use crate::bundler::error::{ErrorExt, Result};
use std::path::{Path, PathBuf};

/// Lock file name inside the build directory.
pub const LOCK_FILE_NAME: &str = ".bundle.lock";

/// Advisory lock on `build_dir/.bundle.lock`, released on drop.
///
/// A second run against the same build directory fails immediately with
/// [`Error::Locked`](crate::bundler::Error::Locked) instead of interleaving
/// with the first one's staging writes.
#[derive(Debug)]
pub struct BuildDirLock {
    path: PathBuf,
    #[cfg(unix)]
    _lock: nix::fcntl::Flock<std::fs::File>,
}

impl BuildDirLock {
    /// Creates the build directory if needed and takes the lock.
    #[cfg(unix)]
    pub fn acquire(build_dir: &Path) -> Result<Self> {
        use nix::fcntl::{Flock, FlockArg};

        std::fs::create_dir_all(build_dir).fs_context("creating build directory", build_dir)?;
        let path = build_dir.join(LOCK_FILE_NAME);
        let file = std::fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .fs_context("opening lock file", &path)?;

        let lock = Flock::lock(file, FlockArg::LockExclusiveNonblock).map_err(|(_, errno)| {
            log::debug!("flock on {} failed: {}", path.display(), errno);
            crate::bundler::Error::Locked { path: path.clone() }
        })?;

        log::debug!("Locked {}", path.display());
        Ok(Self { path, _lock: lock })
    }

    /// Creates the build directory if needed; locking is unix-only.
    #[cfg(not(unix))]
    pub fn acquire(build_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(build_dir).fs_context("creating build directory", build_dir)?;
        Ok(Self {
            path: build_dir.join(LOCK_FILE_NAME),
        })
    }

    /// Lock file location.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::bundler::Error;

    #[test]
    fn second_lock_on_same_dir_fails_until_first_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let build = dir.path().join("build");

        let first = BuildDirLock::acquire(&build).unwrap();
        assert!(first.path().exists());
        assert!(matches!(
            BuildDirLock::acquire(&build),
            Err(Error::Locked { .. })
        ));

        drop(first);
        BuildDirLock::acquire(&build).unwrap();
    }
}
