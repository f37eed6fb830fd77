//! Top-level error types for the CLI and library entry points.

use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, BundlerError>;

/// Main error type for everything outside the pipeline itself
#[derive(Error, Debug)]
pub enum BundlerError {
    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// Pipeline errors
    #[error("{0}")]
    Bundler(#[from] crate::bundler::Error),

    /// Generic errors from anyhow
    #[error("{0:#}")]
    Anyhow(#[from] anyhow::Error),
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },

    /// Missing required argument
    #[error("Missing required argument: {argument}")]
    MissingArgument {
        /// Argument name
        argument: String,
    },
}

impl BundlerError {
    /// Stage the pipeline failed in, if that is where the error came from.
    pub fn failed_stage(&self) -> Option<crate::bundler::Stage> {
        match self {
            BundlerError::Bundler(e) => e.stage(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::{Error, Stage};

    #[test]
    fn stage_failures_surface_through_the_cli_error() {
        let err: BundlerError = Error::Config("bad".into())
            .in_stage(Stage::CopyLicense)
            .into();
        assert_eq!(err.failed_stage(), Some(Stage::CopyLicense));
        assert!(err.to_string().contains("copy-license"));
    }

    #[test]
    fn missing_argument_names_it() {
        let err: BundlerError = CliError::MissingArgument {
            argument: "--artifact-name".into(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "CLI error: Missing required argument: --artifact-name"
        );
    }
}
