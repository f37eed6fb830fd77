//! The validated, immutable bundle configuration.

use super::{RuntimeSpec, Timeouts, ToolCommand};
use crate::bundler::builder::Variant;
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

/// Name of the staging directory under the build dir.
pub const STAGING_DIR_NAME: &str = "bundle";

/// Everything one pipeline run needs, fixed for the run's duration.
///
/// Constructed via [`BundleSpecBuilder`](super::BundleSpecBuilder), which
/// resolves defaults and validates every field once. All paths are absolute.
///
/// # Examples
///
/// ```no_run
/// use kodegen_bundler_node::bundler::BundleSpecBuilder;
///
/// # fn example() -> kodegen_bundler_node::bundler::Result<()> {
/// let spec = BundleSpecBuilder::new()
///     .project_dir("/work/app")
///     .build_dir("build")
///     .artifact_name("app")
///     .source_patterns(["**/*.js", "!node_modules/**"])
///     .build()?;
/// assert_eq!(spec.artifact_file_name(), "app.tar.gz");
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct BundleSpec {
    pub(super) project_dir: PathBuf,
    pub(super) build_dir: PathBuf,
    pub(super) artifact_name: String,
    pub(super) source_patterns: Vec<String>,
    pub(super) embedded_packages: BTreeMap<String, Vec<String>>,
    pub(super) entrypoint: String,
    pub(super) post_bundle_filter: Vec<String>,
    pub(super) post_compile_filter: Vec<String>,
    pub(super) runtime: Option<RuntimeSpec>,
    pub(super) registry_url: Option<String>,
    pub(super) compiler: Option<ToolCommand>,
    pub(super) installer: ToolCommand,
    pub(super) license_file: Option<PathBuf>,
    pub(super) timeouts: Timeouts,
}

impl BundleSpec {
    /// Project root all source patterns are relative to.
    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// Output root.
    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    /// Staging directory, `build_dir/bundle`.
    pub fn staging_dir(&self) -> PathBuf {
        self.build_dir.join(STAGING_DIR_NAME)
    }

    /// Archive base name and its top-level directory.
    pub fn artifact_name(&self) -> &str {
        &self.artifact_name
    }

    /// `<artifact_name>.tar.gz`
    pub fn artifact_file_name(&self) -> String {
        format!("{}.tar.gz", self.artifact_name)
    }

    /// Final archive location.
    pub fn artifact_path(&self) -> PathBuf {
        self.build_dir.join(self.artifact_file_name())
    }

    /// Include/exclude patterns for application sources.
    pub fn source_patterns(&self) -> &[String] {
        &self.source_patterns
    }

    /// Packages whose source is compiled into the entry file.
    pub fn embedded_packages(&self) -> &BTreeMap<String, Vec<String>> {
        &self.embedded_packages
    }

    /// Entry module path relative to the project root.
    pub fn entrypoint(&self) -> &str {
        &self.entrypoint
    }

    /// Patterns deleted from staging after bundling.
    pub fn post_bundle_filter(&self) -> &[String] {
        &self.post_bundle_filter
    }

    /// Patterns deleted from staging after compiling.
    pub fn post_compile_filter(&self) -> &[String] {
        &self.post_compile_filter
    }

    /// Runtime to embed, if any.
    pub fn runtime(&self) -> Option<&RuntimeSpec> {
        self.runtime.as_ref()
    }

    /// Registry override for dependency installation.
    pub fn registry_url(&self) -> Option<&str> {
        self.registry_url.as_deref()
    }

    /// Compiler command, if compilation is enabled.
    pub fn compiler(&self) -> Option<&ToolCommand> {
        self.compiler.as_ref()
    }

    /// Dependency installer command.
    pub fn installer(&self) -> &ToolCommand {
        &self.installer
    }

    /// Explicit license file; `None` means search the conventional names.
    pub fn license_file(&self) -> Option<&Path> {
        self.license_file.as_deref()
    }

    /// Time budgets for external operations.
    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    /// Pipeline variant implied by this configuration.
    ///
    /// Compilation or embedding selects the full pipeline; otherwise the
    /// minimal one runs.
    pub fn variant(&self) -> Variant {
        if self.compiler.is_some() || !self.embedded_packages.is_empty() {
            Variant::Full
        } else {
            Variant::Minimal
        }
    }
}
