//! Pipeline construction and execution.
//!
//! This module provides the [`Pipeline`] that drives assembler stages in
//! their fixed order against one build directory.

use crate::bundler::{
    BundledArtifact, Result,
    assembler::Assembler,
    error::ErrorExt,
    settings::BundleSpec,
};

use super::{
    checksum::calculate_sha256,
    lock::BuildDirLock,
    stage::{Stage, validate_plan},
};

/// Ordered stage runner for one [`BundleSpec`].
///
/// The stage list is fixed at construction from the configuration's
/// [`Variant`](super::Variant) and validated once. A run holds an exclusive
/// lock on the build directory, executes stages strictly in order, and stops
/// at the first failure without rolling anything back; re-running starts
/// over from `clean`.
///
/// # Examples
///
/// ```no_run
/// use kodegen_bundler_node::bundler::{BundleSpecBuilder, Pipeline};
///
/// # async fn example() -> kodegen_bundler_node::bundler::Result<()> {
/// let spec = BundleSpecBuilder::new()
///     .project_dir(".")
///     .build_dir("build")
///     .artifact_name("app")
///     .source_patterns(["**/*.js", "!node_modules/**"])
///     .build()?;
///
/// let pipeline = Pipeline::new(spec)?;
/// let artifact = pipeline.run().await?;
/// println!("Created: {} ({} bytes)", artifact.path.display(), artifact.size);
/// println!("SHA256: {}", artifact.checksum);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Pipeline {
    assembler: Assembler,
    stages: Vec<Stage>,
}

impl Pipeline {
    /// Resolves paths and settles the stage list.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the runtime cannot be resolved or the
    /// stage plan is inconsistent. Nothing on disk is touched.
    pub fn new(spec: BundleSpec) -> Result<Self> {
        let stages = spec.variant().stages().to_vec();
        validate_plan(&stages)?;
        let assembler = Assembler::new(spec)?;

        log::debug!(
            "Planned {} stages: {}",
            stages.len(),
            stages
                .iter()
                .map(|s| s.name())
                .collect::<Vec<_>>()
                .join(" → ")
        );
        Ok(Self { assembler, stages })
    }

    /// The configuration this pipeline runs.
    pub fn spec(&self) -> &BundleSpec {
        self.assembler.spec()
    }

    /// Stages [`run`](Self::run) executes, in order.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// The stage implementations.
    pub fn assembler(&self) -> &Assembler {
        &self.assembler
    }

    /// Executes every planned stage and describes the archive.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Locked`](crate::bundler::Error::Locked) if another
    /// run owns the build directory. Any stage failure is returned wrapped in
    /// [`Error::Stage`](crate::bundler::Error::Stage) naming the stage; later
    /// stages do not run.
    pub async fn run(&self) -> Result<BundledArtifact> {
        let _lock = BuildDirLock::acquire(self.spec().build_dir())?;
        log::info!(
            "Bundling {} into {}",
            self.spec().artifact_name(),
            self.spec().build_dir().display()
        );

        let total = self.stages.len();
        for (index, stage) in self.stages.iter().copied().enumerate() {
            log::info!("[{}/{}] {}", index + 1, total, stage);
            self.assembler
                .execute(stage)
                .await
                .map_err(|e| e.in_stage(stage))?;
        }

        // still locked: a concurrent clean must not race the checksum
        let artifact = self.describe_artifact().await?;
        log::info!("✓ Bundle complete: {}", artifact.path.display());
        Ok(artifact)
    }

    /// Executes one stage on its own, under the build directory lock.
    ///
    /// Stages outside the planned list are allowed; they are useful for
    /// debugging but may fail if their inputs were never produced.
    pub async fn run_stage(&self, stage: Stage) -> Result<()> {
        let _lock = BuildDirLock::acquire(self.spec().build_dir())?;
        if !self.stages.contains(&stage) {
            log::warn!(
                "Stage {} is not part of the {:?} pipeline",
                stage,
                self.spec().variant()
            );
        }
        log::info!("Running stage {}", stage);
        self.assembler
            .execute(stage)
            .await
            .map_err(|e| e.in_stage(stage))
    }

    async fn describe_artifact(&self) -> Result<BundledArtifact> {
        let path = self.assembler.artifact_path().to_path_buf();
        let size = tokio::fs::metadata(&path)
            .await
            .fs_context("reading artifact metadata", &path)?
            .len();
        let checksum = calculate_sha256(&path).await?;
        Ok(BundledArtifact {
            path,
            size,
            checksum,
        })
    }
}
