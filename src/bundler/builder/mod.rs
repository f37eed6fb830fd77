//! Pipeline orchestration.
//!
//! This module provides the [`Pipeline`] that runs the bundle stages in
//! order, along with the pieces it coordinates:
//!
//! - [`stage`] - stage identities, variants and plan validation
//! - [`orchestrator`] - the [`Pipeline`] itself
//! - [`lock`] - exclusive build directory ownership
//! - [`checksum`] - SHA256 of the finished archive
//!
//! # Example
//!
//! ```no_run
//! use kodegen_bundler_node::bundler::{BundleSpecBuilder, Pipeline, Stage};
//!
//! # async fn example() -> kodegen_bundler_node::bundler::Result<()> {
//! let spec = BundleSpecBuilder::new()
//!     .project_dir(".")
//!     .build_dir("build")
//!     .artifact_name("app")
//!     .build()?;
//!
//! let pipeline = Pipeline::new(spec)?;
//! // Re-run one stage while debugging
//! pipeline.run_stage(Stage::CopySources).await?;
//! # Ok(())
//! # }
//! ```

mod checksum;
mod lock;
mod orchestrator;
mod stage;

pub use checksum::calculate_sha256;
pub use lock::{BuildDirLock, LOCK_FILE_NAME};
pub use orchestrator::Pipeline;
pub use stage::{Stage, Variant, validate_plan};
