//! Stage implementations bound to one staging directory.
//!
//! [`Assembler`] resolves every path and pattern list from the
//! [`BundleSpec`] once, at construction, and exposes one async method per
//! [`Stage`]. It holds no other state; everything a stage produces lives on
//! disk under the staging directory.
//!
//! Stage methods are grouped by concern:
//!
//! - [`deps`] - dependency installation and manifest merging
//! - [`copy`] - source and embedded package copies
//! - [`compile`] - compiler invocation and entrypoint rename
//! - [`prune`] - post-compile and post-bundle deletions
//! - [`runtime`] - runtime download
//! - [`package`] - license copy and archive creation

mod compile;
mod copy;
mod deps;
mod package;
mod prune;
mod runtime;

use crate::bundler::{
    builder::Stage,
    error::Result,
    globs,
    manifest::{DEPENDENCY_ROOT, MANIFEST_FILE},
    settings::{BundleSpec, ResolvedRuntime},
};
use std::path::{Path, PathBuf};

pub use compile::{COMPILED_OUTPUT, EXTERNALS_SEPARATOR, scan_externals};

/// License file names searched when none is configured.
pub const LICENSE_CANDIDATES: &[&str] = &["COPYING", "LICENSE", "LICENSE.md", "LICENSE.txt"];

/// Paths and selectors derived from a [`BundleSpec`].
#[derive(Debug)]
pub struct Assembler {
    spec: BundleSpec,
    staging_dir: PathBuf,
    artifact_path: PathBuf,
    source_globs: Vec<String>,
    embedded_globs: Vec<String>,
    embedded_staged_dirs: Vec<PathBuf>,
    post_bundle_globs: Vec<String>,
    post_compile_globs: Vec<String>,
    runtime: Option<ResolvedRuntime>,
}

impl Assembler {
    /// Resolves every path list for the run.
    ///
    /// Fails with a configuration error if the runtime cannot be resolved.
    pub fn new(spec: BundleSpec) -> Result<Self> {
        let staging_dir = spec.staging_dir();
        let artifact_path = spec.artifact_path();
        let runtime = spec.runtime().map(|r| r.resolve()).transpose()?;

        Ok(Self {
            source_globs: globs::resolve_relative_globs(spec.project_dir(), spec.source_patterns()),
            embedded_globs: globs::resolve_package_globs(
                spec.project_dir(),
                spec.embedded_packages(),
            ),
            embedded_staged_dirs: globs::package_dirs(
                &staging_dir,
                spec.embedded_packages().keys(),
            ),
            post_bundle_globs: globs::resolve_relative_globs(&staging_dir, spec.post_bundle_filter()),
            post_compile_globs: globs::resolve_relative_globs(
                &staging_dir,
                spec.post_compile_filter(),
            ),
            staging_dir,
            artifact_path,
            runtime,
            spec,
        })
    }

    /// The configuration this assembler was built from.
    pub fn spec(&self) -> &BundleSpec {
        &self.spec
    }

    /// Staging root.
    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Final archive path.
    pub fn artifact_path(&self) -> &Path {
        &self.artifact_path
    }

    /// Runtime with its URL settled, if one is configured.
    pub fn runtime(&self) -> Option<&ResolvedRuntime> {
        self.runtime.as_ref()
    }

    /// Resolved source patterns.
    pub fn source_globs(&self) -> &[String] {
        &self.source_globs
    }

    /// Resolved embedded package patterns.
    pub fn embedded_globs(&self) -> &[String] {
        &self.embedded_globs
    }

    /// Dependency install directory inside staging.
    pub fn staged_modules_dir(&self) -> PathBuf {
        self.staging_dir.join(DEPENDENCY_ROOT)
    }

    /// Manifest path inside staging.
    pub fn staged_manifest(&self) -> PathBuf {
        self.staging_dir.join(MANIFEST_FILE)
    }

    /// Executes a single stage.
    pub async fn execute(&self, stage: Stage) -> Result<()> {
        match stage {
            Stage::Clean => self.clean().await,
            Stage::PreinstallProjectDeps => self.preinstall_project_deps().await,
            Stage::CopySources => self.copy_sources().await,
            Stage::CopyEmbeddedPackages => self.copy_embedded_packages().await,
            Stage::MergeDependencyManifest => self.merge_dependency_manifest().await,
            Stage::InstallStagedDeps => self.install_staged_deps().await,
            Stage::CompileEntrypoint => self.compile_entrypoint().await,
            Stage::PruneCompiledSources => self.prune_compiled_sources().await,
            Stage::ApplyPostFilter => self.apply_post_filter().await,
            Stage::RenameCompiledEntrypoint => self.rename_compiled_entrypoint().await,
            Stage::FetchRuntime => self.fetch_runtime().await,
            Stage::CopyLicense => self.copy_license().await,
            Stage::CompressArtifact => self.compress_artifact().await,
        }
    }

    /// Removes the staging directory and the previous archive.
    pub async fn clean(&self) -> Result<()> {
        crate::bundler::utils::fs::remove_dir_all(&self.staging_dir).await?;
        crate::bundler::utils::fs::remove_file(&self.artifact_path).await?;
        log::debug!(
            "Removed {} and {}",
            self.staging_dir.display(),
            self.artifact_path.display()
        );
        Ok(())
    }
}
