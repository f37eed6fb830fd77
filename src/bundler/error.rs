//! Error types for bundling operations.
//!
//! Every failure a pipeline stage can produce maps onto one variant of
//! [`Error`]. When the executor runs a stage it wraps failures in
//! [`Error::Stage`] so the caller always learns which stage broke.

use crate::bundler::builder::Stage;
use std::{
    fmt::Display,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;

/// Result type alias for bundler operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while configuring or running the bundle pipeline.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or missing configuration, detected before any stage mutates disk.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A project or embedded package manifest is missing or malformed.
    #[error("failed to read manifest {}: {reason}", path.display())]
    ManifestRead {
        /// Manifest file that could not be used
        path: PathBuf,
        /// Underlying cause
        reason: String,
    },

    /// Filesystem operation failed on a known path.
    #[error("{context} {}: {source}", path.display())]
    Fs {
        /// What was being attempted
        context: String,
        /// Path the operation targeted
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Filesystem operation failed without path context.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Runtime download failed (connection error or non-2xx status).
    #[error("download of {url} failed: {reason}")]
    Network {
        /// URL being fetched
        url: String,
        /// Underlying cause
        reason: String,
    },

    /// An external process exited unsuccessfully.
    #[error("`{command}` failed ({status}): {stderr}")]
    Subprocess {
        /// Command line that was run
        command: String,
        /// Exit status description
        status: String,
        /// Captured standard error
        stderr: String,
    },

    /// An external process or download exceeded its time budget.
    #[error("`{operation}` timed out after {}s", timeout.as_secs())]
    Timeout {
        /// Operation that timed out
        operation: String,
        /// Budget that was exceeded
        timeout: Duration,
    },

    /// A glob pattern could not be compiled.
    #[error("invalid glob pattern `{pattern}`: {reason}")]
    Pattern {
        /// Offending pattern
        pattern: String,
        /// Parser message
        reason: String,
    },

    /// Another run holds the build directory.
    #[error("build directory {} is locked by another run", path.display())]
    Locked {
        /// Lock file path
        path: PathBuf,
    },

    /// A pipeline stage failed.
    #[error("stage `{stage}` failed: {source}")]
    Stage {
        /// Stage that failed
        stage: Stage,
        /// Failure raised by the stage
        #[source]
        source: Box<Error>,
    },

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Directory traversal errors
    #[error("directory walk failed: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// Path prefix stripping errors
    #[error("path error: {0}")]
    StripPrefix(#[from] std::path::StripPrefixError),

    /// Catch-all for messages built with [`bail!`](crate::bail).
    #[error("{0}")]
    GenericError(String),
}

impl Error {
    /// Wraps this error with the stage it occurred in.
    ///
    /// Already wrapped errors are returned untouched.
    pub fn in_stage(self, stage: Stage) -> Self {
        match self {
            Error::Stage { .. } => self,
            other => Error::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// Returns the failed stage, if the error came out of the executor.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Error::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Returns the innermost error, looking through stage wrappers.
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::Stage { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Attaches path context to IO results.
pub trait ErrorExt<T> {
    /// Converts an IO error into [`Error::Fs`] naming the operation and path.
    fn fs_context(self, context: &str, path: impl AsRef<Path>) -> Result<T>;
}

impl<T> ErrorExt<T> for std::result::Result<T, std::io::Error> {
    fn fs_context(self, context: &str, path: impl AsRef<Path>) -> Result<T> {
        self.map_err(|source| Error::Fs {
            context: context.to_string(),
            path: path.as_ref().to_path_buf(),
            source,
        })
    }
}

/// Adds a message to `Option`s and foreign errors.
pub trait Context<T> {
    /// Converts `None` or an error into [`Error::GenericError`] with `msg`.
    fn context<C: Display + Send + Sync + 'static>(self, msg: C) -> Result<T>;
}

impl<T> Context<T> for Option<T> {
    fn context<C: Display + Send + Sync + 'static>(self, msg: C) -> Result<T> {
        self.ok_or_else(|| Error::GenericError(msg.to_string()))
    }
}

impl<T, E: Display> Context<T> for std::result::Result<T, E> {
    fn context<C: Display + Send + Sync + 'static>(self, msg: C) -> Result<T> {
        self.map_err(|e| Error::GenericError(format!("{msg}: {e}")))
    }
}

/// Returns early with an [`Error::GenericError`] built from a format string.
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::bundler::Error::GenericError(format!($($arg)*)))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_wrapping_names_the_stage() {
        let err = Error::Network {
            url: "http://example/bin".into(),
            reason: "connection refused".into(),
        }
        .in_stage(Stage::FetchRuntime);

        assert_eq!(err.stage(), Some(Stage::FetchRuntime));
        let message = err.to_string();
        assert!(message.contains("fetch-runtime"), "{message}");
        assert!(message.contains("connection refused"), "{message}");
    }

    #[test]
    fn stage_wrapping_is_not_nested() {
        let err = Error::Config("x".into())
            .in_stage(Stage::Clean)
            .in_stage(Stage::CopyLicense);
        assert_eq!(err.stage(), Some(Stage::Clean));
        assert!(matches!(err.root_cause(), Error::Config(_)));
    }

    #[test]
    fn fs_context_keeps_path() {
        let result: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "gone",
        ));
        let err = result.fs_context("copying file", "/tmp/a.js").unwrap_err();
        assert_eq!(err.to_string(), "copying file /tmp/a.js: gone");
    }
}
