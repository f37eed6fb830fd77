//! Stage identities and the ordered plans they form.

use crate::bundler::error::{Error, Result};
use std::{fmt, str::FromStr};

/// One named step of the bundle pipeline.
///
/// Variants are declared in canonical execution order; every plan is a
/// subsequence of [`Stage::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, clap::ValueEnum)]
pub enum Stage {
    /// Delete the staging directory and the previous archive.
    Clean,
    /// Install the project's own dependencies in the project root.
    PreinstallProjectDeps,
    /// Copy application sources into staging.
    CopySources,
    /// Copy embedded package sources into staging.
    CopyEmbeddedPackages,
    /// Write the merged dependency manifest into staging.
    MergeDependencyManifest,
    /// Install production dependencies inside staging.
    InstallStagedDeps,
    /// Run the external compiler on the entrypoint.
    CompileEntrypoint,
    /// Delete sources made redundant by compilation.
    PruneCompiledSources,
    /// Delete paths matching the post-bundle filter.
    ApplyPostFilter,
    /// Move the compiled output onto the entrypoint path.
    RenameCompiledEntrypoint,
    /// Download the runtime binary.
    FetchRuntime,
    /// Copy the license file.
    CopyLicense,
    /// Write the `.tar.gz` archive.
    CompressArtifact,
}

impl Stage {
    /// Every stage in canonical order.
    pub const ALL: [Stage; 13] = [
        Stage::Clean,
        Stage::PreinstallProjectDeps,
        Stage::CopySources,
        Stage::CopyEmbeddedPackages,
        Stage::MergeDependencyManifest,
        Stage::InstallStagedDeps,
        Stage::CompileEntrypoint,
        Stage::PruneCompiledSources,
        Stage::ApplyPostFilter,
        Stage::RenameCompiledEntrypoint,
        Stage::FetchRuntime,
        Stage::CopyLicense,
        Stage::CompressArtifact,
    ];

    /// Kebab-case name used in logs, errors and the CLI.
    pub fn name(self) -> &'static str {
        match self {
            Stage::Clean => "clean",
            Stage::PreinstallProjectDeps => "preinstall-project-deps",
            Stage::CopySources => "copy-sources",
            Stage::CopyEmbeddedPackages => "copy-embedded-packages",
            Stage::MergeDependencyManifest => "merge-dependency-manifest",
            Stage::InstallStagedDeps => "install-staged-deps",
            Stage::CompileEntrypoint => "compile-entrypoint",
            Stage::PruneCompiledSources => "prune-compiled-sources",
            Stage::ApplyPostFilter => "apply-post-filter",
            Stage::RenameCompiledEntrypoint => "rename-compiled-entrypoint",
            Stage::FetchRuntime => "fetch-runtime",
            Stage::CopyLicense => "copy-license",
            Stage::CompressArtifact => "compress-artifact",
        }
    }

    /// Position in canonical order.
    pub fn position(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Stage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Stage::ALL
            .into_iter()
            .find(|stage| stage.name() == s)
            .ok_or_else(|| Error::Config(format!("unknown stage `{s}`")))
    }
}

/// Which stage sequence a run executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Compile the entrypoint and inline embedded packages.
    Full,
    /// Ship sources as-is with their declared dependencies.
    Minimal,
}

const FULL_PLAN: &[Stage] = &Stage::ALL;

const MINIMAL_PLAN: &[Stage] = &[
    Stage::Clean,
    Stage::PreinstallProjectDeps,
    Stage::CopySources,
    Stage::InstallStagedDeps,
    Stage::ApplyPostFilter,
    Stage::FetchRuntime,
    Stage::CopyLicense,
    Stage::CompressArtifact,
];

impl Variant {
    /// Ordered stages for this variant.
    pub fn stages(self) -> &'static [Stage] {
        match self {
            Variant::Full => FULL_PLAN,
            Variant::Minimal => MINIMAL_PLAN,
        }
    }
}

/// Checks that `plan` can be executed as a linear pipeline.
///
/// The plan must start with [`Stage::Clean`], end with
/// [`Stage::CompressArtifact`], and follow canonical order without repeats.
pub fn validate_plan(plan: &[Stage]) -> Result<()> {
    match (plan.first(), plan.last()) {
        (Some(Stage::Clean), Some(Stage::CompressArtifact)) => {}
        _ => {
            return Err(Error::Config(
                "a plan must start with `clean` and end with `compress-artifact`".into(),
            ));
        }
    }
    if let Some(pair) = plan.windows(2).find(|w| w[0].position() >= w[1].position()) {
        return Err(Error::Config(format!(
            "stage `{}` cannot run after `{}`",
            pair[1], pair[0]
        )));
    }
    Ok(())
}
