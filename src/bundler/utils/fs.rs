//! File system utilities for bundling.
//!
//! Idempotent create/remove helpers plus copy functions that create parent
//! directories and preserve symlinks.

use crate::bundler::error::{Error, ErrorExt, Result};
use std::{
    io,
    path::{Component, Path, PathBuf},
};
use tokio::fs;

/// Creates all directories of `path`, erasing it first if requested.
pub async fn create_dir_all(path: &Path, erase: bool) -> Result<()> {
    if erase {
        remove_dir_all(path).await?;
    }
    fs::create_dir_all(path)
        .await
        .fs_context("creating directory", path)
}

/// Removes a directory tree; a missing directory is not an error.
pub async fn remove_dir_all(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).fs_context("removing directory", path),
    }
}

/// Removes a file; a missing file is not an error.
pub async fn remove_file(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).fs_context("removing file", path),
    }
}

/// Removes whatever is at `path`, without following symlinks.
pub async fn remove_path(path: &Path) -> Result<()> {
    match fs::symlink_metadata(path).await {
        Ok(meta) if meta.is_dir() => remove_dir_all(path).await,
        Ok(_) => remove_file(path).await,
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).fs_context("inspecting", path),
    }
}

/// Renames `from` to `to`, creating the destination's parent.
pub async fn rename(from: &Path, to: &Path) -> Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)
            .await
            .fs_context("creating directory", parent)?;
    }
    fs::rename(from, to)
        .await
        .fs_context(&format!("renaming {} to", from.display()), to)
}

/// Makes a symbolic link.
#[cfg(unix)]
fn symlink(target: &Path, link: &Path, _is_dir: bool) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

/// Makes a symbolic link.
#[cfg(windows)]
fn symlink(target: &Path, link: &Path, is_dir: bool) -> io::Result<()> {
    if is_dir {
        std::os::windows::fs::symlink_dir(target, link)
    } else {
        std::os::windows::fs::symlink_file(target, link)
    }
}

/// Copies a regular file, creating parent directories of the destination.
///
/// Fails if the source is a directory or doesn't exist.
pub async fn copy_file(from: &Path, to: &Path) -> Result<()> {
    if !from.is_file() {
        return Err(Error::GenericError(format!(
            "{} does not exist or is not a file",
            from.display()
        )));
    }
    if let Some(dest_dir) = to.parent() {
        fs::create_dir_all(dest_dir)
            .await
            .fs_context("creating directory", dest_dir)?;
    }
    fs::copy(from, to).await.fs_context("copying to", to)?;
    Ok(())
}

/// Joins `relative` onto `base`, refusing paths that would leave `base`.
pub fn join_within(base: &Path, relative: &Path) -> Result<PathBuf> {
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return Err(Error::GenericError(format!(
            "{} escapes {}",
            relative.display(),
            base.display()
        )));
    }
    Ok(base.join(relative))
}

/// Copies selected files from under `from_root` to the same relative
/// location under `to_root`.
///
/// Symlinks are recreated rather than followed. Runs on the blocking pool.
/// Returns the number of entries copied.
pub async fn copy_relative(files: Vec<PathBuf>, from_root: &Path, to_root: &Path) -> Result<usize> {
    let from_root = from_root.to_path_buf();
    let to_root = to_root.to_path_buf();

    tokio::task::spawn_blocking(move || -> Result<usize> {
        for source in &files {
            let relative = source.strip_prefix(&from_root)?;
            let dest = join_within(&to_root, relative)?;
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent).fs_context("creating directory", parent)?;
            }

            let meta = std::fs::symlink_metadata(source).fs_context("inspecting", source)?;
            if meta.file_type().is_symlink() {
                let target = std::fs::read_link(source).fs_context("reading link", source)?;
                if std::fs::symlink_metadata(&dest).is_ok() {
                    std::fs::remove_file(&dest).fs_context("replacing link", &dest)?;
                }
                symlink(&target, &dest, source.is_dir()).fs_context("creating link", &dest)?;
            } else {
                std::fs::copy(source, &dest).fs_context("copying to", &dest)?;
            }
        }
        Ok(files.len())
    })
    .await
    .map_err(|e| Error::GenericError(format!("File copy task panicked: {e}")))?
}

/// Sets `path` to mode 755.
#[cfg(unix)]
pub async fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .await
        .fs_context("setting permissions on", path)
}

/// Executability is not a file mode on this platform.
#[cfg(not(unix))]
pub async fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn removal_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        remove_dir_all(&missing).await.unwrap();
        remove_file(&missing).await.unwrap();
        remove_path(&missing).await.unwrap();
    }

    #[tokio::test]
    async fn copy_relative_preserves_layout() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(src.path().join("lib")).unwrap();
        std::fs::write(src.path().join("lib/a.js"), "a").unwrap();

        let copied = copy_relative(vec![src.path().join("lib/a.js")], src.path(), dst.path())
            .await
            .unwrap();

        assert_eq!(copied, 1);
        assert_eq!(std::fs::read_to_string(dst.path().join("lib/a.js")).unwrap(), "a");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn copy_relative_recreates_symlinks() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        std::fs::write(src.path().join("real.js"), "r").unwrap();
        std::os::unix::fs::symlink("real.js", src.path().join("link.js")).unwrap();

        copy_relative(vec![src.path().join("link.js")], src.path(), dst.path())
            .await
            .unwrap();

        let target = std::fs::read_link(dst.path().join("link.js")).unwrap();
        assert_eq!(target, Path::new("real.js"));
    }

    #[test]
    fn join_within_rejects_escapes() {
        assert!(join_within(Path::new("/a"), Path::new("../b")).is_err());
        assert!(join_within(Path::new("/a"), Path::new("/b")).is_err());
        assert_eq!(
            join_within(Path::new("/a"), Path::new("b/c")).unwrap(),
            Path::new("/a/b/c")
        );
    }
}
