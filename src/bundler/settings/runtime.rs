//! Portable runtime descriptor.

use super::{Arch, Os};
use crate::bundler::error::{Error, Result};
use std::path::{Component, Path};

/// Download template for official Node.js builds.
///
/// Placeholders: `{version}`, `{os}`, `{arch}`.
pub const NODE_DIST_URL_TEMPLATE: &str =
    "https://nodejs.org/dist/v{version}/node-v{version}-{os}-{arch}.tar.gz";

/// Member holding the interpreter inside a Node.js distribution tarball.
pub const NODE_DIST_MEMBER_TEMPLATE: &str = "node-v{version}-{os}-{arch}/bin/node";

/// Default directory, relative to the staging root, the runtime lands in.
pub const DEFAULT_RUNTIME_DIR: &str = "runtime";

/// Runtime binary to embed in the artifact.
///
/// Either `url` points at the payload, or `version` selects an official
/// Node.js build for the host platform.
///
/// # Configuration
///
/// ```toml
/// [runtime]
/// binary_name = "node"
/// version = "18.19.0"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct RuntimeSpec {
    /// Explicit payload URL.
    #[serde(default)]
    pub url: Option<String>,

    /// Version used to derive the URL when `url` is absent.
    #[serde(default)]
    pub version: Option<String>,

    /// File name of the binary inside the artifact.
    pub binary_name: String,

    /// Directory under the staging root the binary is written to.
    #[serde(default = "default_runtime_dir")]
    pub dest_subdir: String,

    /// Path of the binary inside a gzip+tar payload.
    ///
    /// When absent, the first regular file named `binary_name` is used.
    #[serde(default)]
    pub archive_member: Option<String>,
}

fn default_runtime_dir() -> String {
    DEFAULT_RUNTIME_DIR.to_string()
}

/// Runtime descriptor with its download URL settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRuntime {
    /// Payload URL.
    pub url: url::Url,
    /// File name inside the artifact.
    pub binary_name: String,
    /// Directory under the staging root.
    pub dest_subdir: String,
    /// Member to extract from archive payloads.
    pub archive_member: Option<String>,
}

impl RuntimeSpec {
    /// Runtime downloaded from an explicit URL.
    pub fn from_url(url: impl Into<String>, binary_name: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            version: None,
            binary_name: binary_name.into(),
            dest_subdir: default_runtime_dir(),
            archive_member: None,
        }
    }

    /// Node.js runtime derived from a version.
    pub fn node(version: impl Into<String>) -> Self {
        Self {
            url: None,
            version: Some(version.into()),
            binary_name: "node".to_string(),
            dest_subdir: default_runtime_dir(),
            archive_member: None,
        }
    }

    /// Validates the descriptor and settles the download URL for the host.
    pub fn resolve(&self) -> Result<ResolvedRuntime> {
        self.resolve_for(Os::host(), Arch::host())
    }

    /// Like [`resolve`](Self::resolve) for an explicit platform.
    pub fn resolve_for(&self, os: Option<Os>, arch: Option<Arch>) -> Result<ResolvedRuntime> {
        if self.binary_name.is_empty() || !is_single_component(&self.binary_name) {
            return Err(Error::Config(format!(
                "runtime binary name `{}` must be a plain file name",
                self.binary_name
            )));
        }
        if !is_relative_within(&self.dest_subdir) {
            return Err(Error::Config(format!(
                "runtime directory `{}` must be a relative path inside the bundle",
                self.dest_subdir
            )));
        }

        let (raw_url, derived_member) = match (&self.url, &self.version) {
            (Some(url), _) => (url.clone(), None),
            (None, Some(version)) => {
                let version = semver::Version::parse(version.trim_start_matches('v'))
                    .map_err(|e| {
                        Error::Config(format!("runtime version `{version}` is invalid: {e}"))
                    })?;
                let os = os.ok_or_else(|| {
                    Error::Config(format!(
                        "cannot derive a runtime URL for OS `{}`; pass an explicit URL",
                        std::env::consts::OS
                    ))
                })?;
                let arch = arch.ok_or_else(|| {
                    Error::Config(format!(
                        "cannot derive a runtime URL for architecture `{}`; pass an explicit URL",
                        std::env::consts::ARCH
                    ))
                })?;
                let fill = |template: &str| {
                    template
                        .replace("{version}", &version.to_string())
                        .replace("{os}", os.dist_name())
                        .replace("{arch}", arch.dist_name())
                };
                (
                    fill(NODE_DIST_URL_TEMPLATE),
                    Some(fill(NODE_DIST_MEMBER_TEMPLATE)),
                )
            }
            (None, None) => {
                return Err(Error::Config(format!(
                    "runtime `{}` has no URL and no version to derive one from",
                    self.binary_name
                )));
            }
        };

        let url = url::Url::parse(&raw_url)
            .map_err(|e| Error::Config(format!("runtime URL `{raw_url}` is invalid: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "runtime URL `{url}` must use http or https"
            )));
        }

        Ok(ResolvedRuntime {
            url,
            binary_name: self.binary_name.clone(),
            dest_subdir: self.dest_subdir.clone(),
            archive_member: self.archive_member.clone().or(derived_member),
        })
    }
}

fn is_single_component(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// True for non-empty relative paths made only of normal components.
pub(crate) fn is_relative_within(path: &str) -> bool {
    let path = Path::new(path);
    !path.as_os_str().is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_url_is_used_verbatim() {
        let runtime = RuntimeSpec::from_url("http://example/bin", "rt")
            .resolve()
            .unwrap();
        assert_eq!(runtime.url.as_str(), "http://example/bin");
        assert_eq!(runtime.dest_subdir, "runtime");
        assert_eq!(runtime.archive_member, None);
    }

    #[test]
    fn version_derives_node_distribution() {
        let runtime = RuntimeSpec::node("v18.19.0")
            .resolve_for(Some(Os::Linux), Some(Arch::X64))
            .unwrap();
        assert_eq!(
            runtime.url.as_str(),
            "https://nodejs.org/dist/v18.19.0/node-v18.19.0-linux-x64.tar.gz"
        );
        assert_eq!(
            runtime.archive_member.as_deref(),
            Some("node-v18.19.0-linux-x64/bin/node")
        );
    }

    #[test]
    fn name_without_url_or_version_is_a_config_error() {
        let runtime = RuntimeSpec {
            url: None,
            version: None,
            binary_name: "rt".into(),
            dest_subdir: "runtime".into(),
            archive_member: None,
        };
        assert!(matches!(runtime.resolve(), Err(Error::Config(_))));
    }

    #[test]
    fn bad_inputs_are_config_errors() {
        assert!(matches!(
            RuntimeSpec::node("eighteen").resolve_for(Some(Os::Linux), Some(Arch::X64)),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            RuntimeSpec::node("18.0.0").resolve_for(None, Some(Arch::X64)),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            RuntimeSpec::from_url("ftp://example/bin", "rt").resolve(),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            RuntimeSpec::from_url("http://example/bin", "../rt").resolve(),
            Err(Error::Config(_))
        ));

        let mut escaping = RuntimeSpec::from_url("http://example/bin", "rt");
        escaping.dest_subdir = "../outside".into();
        assert!(matches!(escaping.resolve(), Err(Error::Config(_))));
    }
}
