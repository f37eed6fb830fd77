//! License copy and archive creation.

use super::{Assembler, LICENSE_CANDIDATES};
use crate::{
    bail,
    bundler::{
        error::{Context, Error, ErrorExt, Result},
        utils::fs,
    },
};
use flate2::{Compression, write::GzEncoder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

impl Assembler {
    /// Copies the license file into the staging root.
    ///
    /// An explicitly configured file must exist. Otherwise the project root is
    /// searched for [`LICENSE_CANDIDATES`] in order; finding none is only a
    /// warning.
    pub async fn copy_license(&self) -> Result<()> {
        let license = match self.spec.license_file() {
            Some(path) => {
                if !path.is_file() {
                    bail!("license file {} does not exist", path.display());
                }
                path.to_path_buf()
            }
            None => match self.find_license() {
                Some(path) => path,
                None => {
                    log::warn!(
                        "No license file found in {} (looked for {})",
                        self.spec.project_dir().display(),
                        LICENSE_CANDIDATES.join(", ")
                    );
                    return Ok(());
                }
            },
        };

        let file_name = license
            .file_name()
            .context(format!("invalid license path {}", license.display()))?;
        let dest = self.staging_dir.join(file_name);
        fs::copy_file(&license, &dest).await?;
        log::info!("Copied license {}", license.display());
        Ok(())
    }

    fn find_license(&self) -> Option<PathBuf> {
        LICENSE_CANDIDATES
            .iter()
            .map(|name| self.spec.project_dir().join(name))
            .find(|path| path.is_file())
    }

    /// Writes `build_dir/<artifact_name>.tar.gz`.
    ///
    /// Entries are named `<artifact_name>/...` directly from staging, so the
    /// staging directory is never moved and nothing else in the build
    /// directory is read.
    pub async fn compress_artifact(&self) -> Result<()> {
        if !self.staging_dir.is_dir() {
            bail!(
                "staging directory {} does not exist",
                self.staging_dir.display()
            );
        }

        let (entries, size) = self.write_archive().await?;
        log::info!(
            "Created {} ({} entries, {} bytes)",
            self.artifact_path.display(),
            entries,
            size
        );
        Ok(())
    }

    async fn write_archive(&self) -> Result<(usize, u64)> {
        let partial = self
            .artifact_path
            .with_file_name(format!("{}.partial", self.spec.artifact_file_name()));
        fs::remove_file(&partial).await?;

        let staging = self.staging_dir.clone();
        let root = PathBuf::from(self.spec.artifact_name());
        let out = partial.clone();
        let result = tokio::task::spawn_blocking(move || write_tar_gz(&staging, &root, &out))
            .await
            .map_err(|e| Error::GenericError(format!("Archive task panicked: {e}")))?;

        let entries = match result {
            Ok(entries) => entries,
            Err(e) => {
                fs::remove_file(&partial).await?;
                return Err(e);
            }
        };

        fs::rename(&partial, &self.artifact_path).await?;
        let size = tokio::fs::metadata(&self.artifact_path)
            .await
            .fs_context("reading archive metadata", &self.artifact_path)?
            .len();
        Ok((entries, size))
    }
}

/// Archives `staging` with every entry renamed under `root`, in sorted order
/// and with normalized ownership and timestamps.
fn write_tar_gz(staging: &Path, root: &Path, out: &Path) -> Result<usize> {
    let file = std::fs::File::create(out).fs_context("creating archive", out)?;
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    builder.mode(tar::HeaderMode::Deterministic);
    builder.follow_symlinks(false);

    let mut count = 0;
    for entry in WalkDir::new(staging).sort_by_file_name() {
        let entry = entry?;
        let name = root.join(entry.path().strip_prefix(staging)?);
        builder
            .append_path_with_name(entry.path(), &name)
            .fs_context("adding to archive", entry.path())?;
        count += 1;
    }

    builder
        .into_inner()
        .fs_context("finishing archive", out)?
        .finish()
        .fs_context("finishing archive", out)?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::settings::BundleSpecBuilder;
    use flate2::read::GzDecoder;

    fn assembler(project: &Path, name: &str) -> Assembler {
        let spec = BundleSpecBuilder::new()
            .project_dir(project)
            .build_dir("build")
            .artifact_name(name)
            .build()
            .unwrap();
        Assembler::new(spec).unwrap()
    }

    fn archive_names(path: &Path) -> Vec<String> {
        let file = std::fs::File::open(path).unwrap();
        let mut archive = tar::Archive::new(GzDecoder::new(file));
        archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[tokio::test]
    async fn archive_root_is_artifact_name_and_staging_stays_put() {
        let dir = tempfile::tempdir().unwrap();
        let assembler = assembler(dir.path(), "app");
        let staging = assembler.staging_dir().to_path_buf();
        std::fs::create_dir_all(staging.join("lib")).unwrap();
        std::fs::write(staging.join("index.js"), "main").unwrap();
        std::fs::write(staging.join("lib/a.js"), "a").unwrap();

        assembler.compress_artifact().await.unwrap();

        assert!(staging.join("index.js").is_file());
        assert!(!dir.path().join("build/app").exists());
        let names = archive_names(assembler.artifact_path());
        assert!(names.iter().all(|n| n.starts_with("app")), "{names:?}");
        assert!(names.iter().any(|n| n == "app/lib/a.js"), "{names:?}");
        assert!(names.iter().any(|n| n == "app/index.js"), "{names:?}");
    }

    #[tokio::test]
    async fn unrelated_directory_named_like_the_artifact_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let assembler = assembler(dir.path(), "app");
        std::fs::create_dir_all(assembler.staging_dir()).unwrap();
        std::fs::write(assembler.staging_dir().join("index.js"), "main").unwrap();
        std::fs::create_dir_all(dir.path().join("build/app")).unwrap();
        std::fs::write(dir.path().join("build/app/stray.js"), "stray").unwrap();

        assembler.compress_artifact().await.unwrap();

        let names = archive_names(assembler.artifact_path());
        assert!(names.iter().any(|n| n == "app/index.js"), "{names:?}");
        assert!(!names.iter().any(|n| n.contains("stray")), "{names:?}");
        assert!(dir.path().join("build/app/stray.js").is_file());
    }

    #[tokio::test]
    async fn missing_staging_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let assembler = assembler(dir.path(), "app");

        assert!(assembler.compress_artifact().await.is_err());
        assert!(!assembler.artifact_path().exists());
    }

    #[tokio::test]
    async fn license_candidates_are_searched_in_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("LICENSE"), "MIT").unwrap();
        std::fs::write(dir.path().join("COPYING"), "GPL").unwrap();
        let assembler = assembler(dir.path(), "app");

        assembler.copy_license().await.unwrap();

        let staged = assembler.staging_dir().join("COPYING");
        assert_eq!(std::fs::read_to_string(staged).unwrap(), "GPL");
        assert!(!assembler.staging_dir().join("LICENSE").exists());
    }

    #[tokio::test]
    async fn missing_license_is_skipped_unless_configured() {
        let dir = tempfile::tempdir().unwrap();
        assembler(dir.path(), "app").copy_license().await.unwrap();

        let spec = BundleSpecBuilder::new()
            .project_dir(dir.path())
            .build_dir("build")
            .artifact_name("app")
            .license_file("NOTICE")
            .build()
            .unwrap();
        let err = Assembler::new(spec).unwrap().copy_license().await.unwrap_err();
        assert!(err.to_string().contains("NOTICE"), "{err}");
    }
}
