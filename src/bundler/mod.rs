//! Release bundling for Node.js applications.
//!
//! Turns a project's source tree, a chosen subset of its dependencies and an
//! optional runtime binary into one `<artifact_name>.tar.gz` whose single
//! top-level directory is `<artifact_name>/`.
//!
//! # Overview
//!
//! The bundler:
//! 1. Validates a [`BundleSpec`] once, before touching the disk
//! 2. Picks the full or minimal [`Variant`] and its ordered [`Stage`] list
//! 3. Runs every stage against one staging directory under an exclusive lock
//! 4. Stops at the first failure, naming the stage in the error
//! 5. Returns a [`BundledArtifact`] with the archive's size and checksum
//!
//! # Module Organization
//!
//! - [`globs`] - project-relative pattern resolution and file selection
//! - [`manifest`] - `package.json` reading and dependency merging
//! - [`settings`] - [`BundleSpec`] and its builder
//! - [`assembler`] - one method per stage, all rooted at staging
//! - [`builder`] - the [`Pipeline`] that orders and runs stages
//! - [`utils`] - filesystem, download and subprocess helpers

pub mod assembler;
pub mod builder;
pub mod error;
pub mod globs;
pub mod manifest;
pub mod settings;
pub mod utils;

use std::path::PathBuf;

pub use assembler::Assembler;
pub use builder::{BuildDirLock, Pipeline, Stage, Variant, validate_plan};
pub use error::{Error, Result};
pub use globs::{Selector, resolve_package_globs, resolve_relative_globs};
pub use manifest::{PackageManifest, merge_manifests};
pub use settings::{
    Arch, BundleSpec, BundleSpecBuilder, Os, ResolvedRuntime, RuntimeSpec, Timeouts, ToolCommand,
};

/// The archive a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundledArtifact {
    /// Absolute path of `<artifact_name>.tar.gz`.
    pub path: PathBuf,
    /// Size in bytes.
    pub size: u64,
    /// Lowercase hex SHA256 of the archive.
    pub checksum: String,
}
