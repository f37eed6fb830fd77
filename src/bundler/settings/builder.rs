//! Builder for constructing a [`BundleSpec`].

use super::{BundleSpec, RuntimeSpec, Timeouts, ToolCommand, runtime::is_relative_within};
use crate::bundler::error::{Error, Result};
use path_absolutize::Absolutize;
use std::{
    collections::BTreeMap,
    path::{Component, Path, PathBuf},
};

/// Default entry module.
pub const DEFAULT_ENTRYPOINT: &str = "index.js";

/// Builder for [`BundleSpec`].
///
/// Defaults are resolved once in [`build`](Self::build):
///
/// | field | default |
/// |---|---|
/// | `entrypoint` | `index.js` |
/// | `post_bundle_filter` | empty |
/// | `post_compile_filter` | the source patterns |
/// | `installer` | `npm install` |
/// | `runtime`, `compiler`, `registry_url`, `license_file` | none |
///
/// # Errors
///
/// [`build`](Self::build) returns [`Error::Config`] for any missing or
/// inconsistent field, before anything touches the filesystem.
#[derive(Default, Debug)]
pub struct BundleSpecBuilder {
    project_dir: Option<PathBuf>,
    build_dir: Option<PathBuf>,
    artifact_name: Option<String>,
    source_patterns: Vec<String>,
    embedded_packages: BTreeMap<String, Vec<String>>,
    entrypoint: Option<String>,
    post_bundle_filter: Option<Vec<String>>,
    post_compile_filter: Option<Vec<String>>,
    runtime: Option<RuntimeSpec>,
    registry_url: Option<String>,
    compiler: Option<ToolCommand>,
    installer: Option<ToolCommand>,
    license_file: Option<PathBuf>,
    timeouts: Timeouts,
}

impl BundleSpecBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Default::default()
    }

    /// Sets the project root. Required.
    pub fn project_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.project_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the output root; relative paths resolve against the project root. Required.
    pub fn build_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.build_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the archive base name. Required.
    pub fn artifact_name(mut self, name: impl Into<String>) -> Self {
        self.artifact_name = Some(name.into());
        self
    }

    /// Sets the source include/exclude patterns.
    pub fn source_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.source_patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a package to embed with its file patterns.
    pub fn embed_package<I, S>(mut self, package: impl Into<String>, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.embedded_packages.insert(
            package.into(),
            patterns.into_iter().map(Into::into).collect(),
        );
        self
    }

    /// Sets the entry module.
    pub fn entrypoint(mut self, entrypoint: impl Into<String>) -> Self {
        self.entrypoint = Some(entrypoint.into());
        self
    }

    /// Sets the patterns deleted after bundling.
    pub fn post_bundle_filter<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.post_bundle_filter = Some(patterns.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the patterns deleted after compiling.
    pub fn post_compile_filter<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.post_compile_filter = Some(patterns.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the runtime to embed.
    pub fn runtime(mut self, runtime: RuntimeSpec) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Sets the registry used by the installer.
    pub fn registry_url(mut self, url: impl Into<String>) -> Self {
        self.registry_url = Some(url.into());
        self
    }

    /// Enables compilation with the given command.
    pub fn compiler(mut self, compiler: ToolCommand) -> Self {
        self.compiler = Some(compiler);
        self
    }

    /// Overrides the dependency installer.
    pub fn installer(mut self, installer: ToolCommand) -> Self {
        self.installer = Some(installer);
        self
    }

    /// Sets the license file; relative paths resolve against the project root.
    pub fn license_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.license_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Overrides the time budgets.
    pub fn timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Validates every field and builds the [`BundleSpec`].
    pub fn build(self) -> Result<BundleSpec> {
        let project_dir = self
            .project_dir
            .ok_or_else(|| Error::Config("project_dir is required".into()))?;
        let project_dir = absolutize(&project_dir, None)?;

        let build_dir = self
            .build_dir
            .ok_or_else(|| Error::Config("build_dir is required".into()))?;
        let build_dir = absolutize(&build_dir, Some(&project_dir))?;

        let artifact_name = self
            .artifact_name
            .ok_or_else(|| Error::Config("artifact_name is required".into()))?;
        validate_artifact_name(&artifact_name)?;

        let entrypoint = self
            .entrypoint
            .unwrap_or_else(|| DEFAULT_ENTRYPOINT.to_string());
        if !is_relative_within(&entrypoint) {
            return Err(Error::Config(format!(
                "entrypoint `{entrypoint}` must be a relative path inside the project"
            )));
        }

        for package in self.embedded_packages.keys() {
            if !is_package_name(package) {
                return Err(Error::Config(format!(
                    "embedded package name `{package}` is not a valid package name"
                )));
            }
        }
        if !self.embedded_packages.is_empty() && self.compiler.is_none() {
            return Err(Error::Config(
                "embedded packages are compiled into the entrypoint and need a compiler".into(),
            ));
        }

        if let Some(runtime) = &self.runtime {
            runtime.resolve()?;
        }

        if let Some(registry) = &self.registry_url {
            url::Url::parse(registry)
                .map_err(|e| Error::Config(format!("registry URL `{registry}` is invalid: {e}")))?;
        }

        let compiler = self
            .compiler
            .map(|compiler| resolve_program(compiler, "compiler", &project_dir))
            .transpose()?;
        let installer = resolve_program(
            self.installer.unwrap_or_else(ToolCommand::npm_install),
            "installer",
            &project_dir,
        )?;

        let license_file = self
            .license_file
            .map(|path| absolutize(&path, Some(&project_dir)))
            .transpose()?;

        if self.source_patterns.is_empty() {
            log::warn!("No source patterns configured; the bundle will contain no sources");
        }

        let post_compile_filter = self
            .post_compile_filter
            .unwrap_or_else(|| self.source_patterns.clone());

        Ok(BundleSpec {
            project_dir,
            build_dir,
            artifact_name,
            source_patterns: self.source_patterns,
            embedded_packages: self.embedded_packages,
            entrypoint,
            post_bundle_filter: self.post_bundle_filter.unwrap_or_default(),
            post_compile_filter,
            runtime: self.runtime,
            registry_url: self.registry_url,
            compiler,
            installer,
            license_file,
            timeouts: self.timeouts,
        })
    }
}

fn absolutize(path: &Path, base: Option<&Path>) -> Result<PathBuf> {
    let absolute = match base {
        Some(base) => path.absolutize_from(base),
        None => path.absolutize(),
    }
    .map_err(|e| Error::Config(format!("cannot resolve path {}: {e}", path.display())))?;
    Ok(absolute.into_owned())
}

/// Anchors a program given as a path (`./scripts/compile.sh`) at the project
/// root; bare names are left for the `PATH` lookup.
fn resolve_program(mut tool: ToolCommand, role: &str, project_dir: &Path) -> Result<ToolCommand> {
    if tool.program.is_empty() {
        return Err(Error::Config(format!("{role} program must not be empty")));
    }
    if tool.program.contains(['/', std::path::MAIN_SEPARATOR]) {
        let program = absolutize(Path::new(&tool.program), Some(project_dir))?;
        tool.program = program.to_string_lossy().into_owned();
    }
    Ok(tool)
}

/// `name` or `@scope/name`, with no empty, `.` or `..` parts.
fn is_package_name(name: &str) -> bool {
    let valid = |part: &str| {
        !part.is_empty() && part != "." && part != ".." && !part.contains(['/', '\\'])
    };
    match name.strip_prefix('@') {
        Some(scoped) => scoped
            .split_once('/')
            .is_some_and(|(scope, package)| valid(scope) && valid(package)),
        None => valid(name),
    }
}

fn validate_artifact_name(name: &str) -> Result<()> {
    let mut components = Path::new(name).components();
    let single = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if name.is_empty() || !single || name.contains(['/', '\\']) {
        return Err(Error::Config(format!(
            "artifact name `{name}` must be a non-empty file name"
        )));
    }
    Ok(())
}
