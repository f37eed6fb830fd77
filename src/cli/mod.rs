//! Command line interface for the Node.js release bundler.
//!
//! Parses flags and an optional config file into a
//! [`BundleSpec`](crate::bundler::BundleSpec), then runs either the whole
//! pipeline or one stage.

mod args;
mod config;

pub use args::{Args, DEFAULT_BUILD_DIR};
pub use config::{FileConfig, TimeoutConfig};

use crate::{bundler::Pipeline, error::Result};

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    execute(&args).await
}

/// Runs the pipeline described by `args`.
///
/// Returns the process exit code; every failure is an `Err`.
pub async fn execute(args: &Args) -> Result<i32> {
    let spec = args.to_builder()?.build()?;
    let pipeline = Pipeline::new(spec)?;

    match args.stage {
        Some(stage) => {
            pipeline.run_stage(stage).await?;
            println!("Stage {} complete", stage);
        }
        None => {
            let artifact = pipeline.run().await?;
            println!("Created: {} ({} bytes)", artifact.path.display(), artifact.size);
            println!("SHA256: {}", artifact.checksum);
        }
    }
    Ok(0)
}
