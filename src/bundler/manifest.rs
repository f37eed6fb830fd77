//! Dependency manifest reading and merging.
//!
//! The artifact ships a derived `package.json`: the project's runtime
//! dependencies plus the runtime dependencies of every embedded package, minus
//! the embedded packages themselves (their code is compiled into the entry
//! file). Development-only sections are dropped.

use crate::bundler::error::{Error, ErrorExt, Result};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Manifest file name at the root of a project or package.
pub const MANIFEST_FILE: &str = "package.json";

/// Directory dependencies are installed into.
pub const DEPENDENCY_ROOT: &str = "node_modules";

const DEPENDENCIES: &str = "dependencies";

/// Sections the artifact never needs.
const DEVELOPMENT_SECTIONS: &[&str] = &["devDependencies"];

/// A parsed `package.json`, with every field preserved.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageManifest {
    path: PathBuf,
    document: Map<String, Value>,
}

impl PackageManifest {
    /// Reads and parses a manifest file.
    pub async fn read(path: &Path) -> Result<Self> {
        let contents = tokio::fs::read(path)
            .await
            .map_err(|e| Error::ManifestRead {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        let value: Value = serde_json::from_slice(&contents).map_err(|e| Error::ManifestRead {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_value(path, value)
    }

    /// Wraps an already parsed document; the root must be an object.
    pub fn from_value(path: impl Into<PathBuf>, value: Value) -> Result<Self> {
        let path = path.into();
        match value {
            Value::Object(document) => Ok(Self { path, document }),
            other => Err(Error::ManifestRead {
                path,
                reason: format!("expected a JSON object, found {}", json_kind(&other)),
            }),
        }
    }

    /// File this manifest was read from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The `name` field, if present.
    pub fn name(&self) -> Option<&str> {
        self.document.get("name").and_then(Value::as_str)
    }

    /// Runtime dependencies; an absent section is empty.
    pub fn dependencies(&self) -> Result<Map<String, Value>> {
        match self.document.get(DEPENDENCIES) {
            None | Some(Value::Null) => Ok(Map::new()),
            Some(Value::Object(deps)) => Ok(deps.clone()),
            Some(other) => Err(Error::ManifestRead {
                path: self.path.clone(),
                reason: format!("`{DEPENDENCIES}` must be an object, found {}", json_kind(other)),
            }),
        }
    }

    /// True when the named section is present.
    pub fn has_section(&self, section: &str) -> bool {
        self.document.contains_key(section)
    }

    /// Serializes as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.document)?)
    }

    /// Writes the manifest to `path`.
    pub async fn write(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        tokio::fs::write(path, json)
            .await
            .fs_context("writing manifest", path)
    }
}

/// Location of an embedded package's manifest under `project_dir`.
pub fn embedded_manifest_path(project_dir: &Path, package: &str) -> PathBuf {
    project_dir
        .join(DEPENDENCY_ROOT)
        .join(package)
        .join(MANIFEST_FILE)
}

/// Reads the manifest of every embedded package.
///
/// Any missing or malformed manifest aborts with [`Error::ManifestRead`].
pub async fn load_embedded_manifests<'a>(
    project_dir: &Path,
    packages: impl IntoIterator<Item = &'a String>,
) -> Result<Vec<(String, PackageManifest)>> {
    let mut manifests = Vec::new();
    for package in packages {
        let path = embedded_manifest_path(project_dir, package);
        let manifest = PackageManifest::read(&path).await?;
        // validate eagerly so a bad section fails here rather than mid-merge
        manifest.dependencies()?;
        manifests.push((package.clone(), manifest));
    }
    Ok(manifests)
}

/// Computes the artifact manifest.
///
/// Embedded dependency constraints override the project's on collision, every
/// embedded package name is removed afterwards, and development sections are
/// stripped.
pub fn merge_manifests(
    project: &PackageManifest,
    embedded: &[(String, PackageManifest)],
) -> Result<PackageManifest> {
    let mut dependencies = project.dependencies()?;

    for (_, manifest) in embedded {
        for (name, constraint) in manifest.dependencies()? {
            dependencies.insert(name, constraint);
        }
    }
    for (package, _) in embedded {
        dependencies.remove(package);
    }

    let mut document = project.document.clone();
    for section in DEVELOPMENT_SECTIONS {
        document.remove(*section);
    }
    document.insert(DEPENDENCIES.to_string(), Value::Object(dependencies));

    Ok(PackageManifest {
        path: project.path.clone(),
        document,
    })
}

/// Strips development sections without merging anything.
pub fn production_manifest(project: &PackageManifest) -> Result<PackageManifest> {
    merge_manifests(project, &[])
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
