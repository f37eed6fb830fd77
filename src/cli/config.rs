//! Optional TOML configuration file.
//!
//! Every field mirrors a command line flag; flags win over file values.
//!
//! ```toml
//! project_dir = "."
//! build_dir = "build"
//! artifact_name = "app"
//! sources = ["**/*.js", "!test{,/**}", "!node_modules/**"]
//! post_bundle_filter = ["**/*.md"]
//!
//! [embed]
//! lodash = ["**/*.js", "!test{,/**}"]
//!
//! [compiler]
//! program = "./scripts/compile.sh"
//!
//! [runtime]
//! binary_name = "node"
//! version = "18.19.0"
//!
//! [timeouts]
//! install_secs = 900
//! ```

use crate::bundler::{RuntimeSpec, Timeouts, ToolCommand};
use anyhow::Context as _;
use serde::Deserialize;
use std::{collections::BTreeMap, path::Path, path::PathBuf, time::Duration};

/// Contents of a `--config` file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Project root; relative paths resolve against the config file's directory.
    pub project_dir: Option<PathBuf>,
    /// Output root, relative to the project.
    pub build_dir: Option<PathBuf>,
    /// Archive base name.
    pub artifact_name: Option<String>,
    /// Source include/exclude patterns.
    #[serde(default)]
    pub sources: Vec<String>,
    /// Embedded packages and their patterns.
    #[serde(default)]
    pub embed: BTreeMap<String, Vec<String>>,
    /// Entry module.
    pub entrypoint: Option<String>,
    /// Deleted after bundling.
    pub post_bundle_filter: Option<Vec<String>>,
    /// Deleted after compiling.
    pub post_compile_filter: Option<Vec<String>>,
    /// Runtime descriptor.
    pub runtime: Option<RuntimeSpec>,
    /// Registry override.
    pub registry: Option<String>,
    /// Compiler command.
    pub compiler: Option<ToolCommand>,
    /// Installer command.
    pub installer: Option<ToolCommand>,
    /// License file.
    pub license: Option<PathBuf>,
    /// Time budgets.
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

/// `[timeouts]` table, in seconds.
#[derive(Debug, Default, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeoutConfig {
    /// Dependency installer runs.
    pub install_secs: Option<u64>,
    /// Compiler run.
    pub compile_secs: Option<u64>,
    /// Runtime download.
    pub download_secs: Option<u64>,
}

impl TimeoutConfig {
    /// Applies the configured values over `base`.
    pub fn apply(&self, mut base: Timeouts) -> Timeouts {
        if let Some(secs) = self.install_secs {
            base.install = Duration::from_secs(secs);
        }
        if let Some(secs) = self.compile_secs {
            base.compile = Duration::from_secs(secs);
        }
        if let Some(secs) = self.download_secs {
            base.download = Duration::from_secs(secs);
        }
        base
    }
}

impl FileConfig {
    /// Reads and parses a config file.
    ///
    /// A relative `project_dir` is resolved against the file's directory.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: FileConfig = toml::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        if let Some(parent) = path.parent() {
            let project_dir = config
                .project_dir
                .take()
                .unwrap_or_else(|| PathBuf::from("."));
            config.project_dir = Some(parent.join(project_dir));
        }

        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle.toml");
        std::fs::write(
            &path,
            r#"
artifact_name = "app"
build_dir = "out"
sources = ["**/*.js"]

[embed]
y = ["**/*.js"]

[compiler]
program = "esbuild"
args = ["--minify"]

[runtime]
binary_name = "rt"
url = "http://example/bin"

[timeouts]
download_secs = 5
"#,
        )
        .unwrap();

        let config = FileConfig::load(&path).unwrap();
        assert_eq!(config.artifact_name.as_deref(), Some("app"));
        assert_eq!(config.project_dir, Some(dir.path().join(".")));
        assert_eq!(config.embed["y"], vec!["**/*.js"]);
        assert_eq!(
            config.compiler,
            Some(ToolCommand::new("esbuild").arg("--minify"))
        );
        let runtime = config.runtime.unwrap();
        assert_eq!(runtime.dest_subdir, "runtime");
        assert_eq!(
            config.timeouts.apply(Timeouts::default()).download,
            Duration::from_secs(5)
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle.toml");
        std::fs::write(&path, "artifact = \"app\"\n").unwrap();

        let err = FileConfig::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("bundle.toml"), "{err:#}");
    }
}
