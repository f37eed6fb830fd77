//! Release bundler for Node.js applications.
//!
//! This library builds a single self-contained `.tar.gz` release from:
//! - the application's sources, selected by glob patterns
//! - its production dependency tree, installed fresh in staging
//! - packages compiled into the entrypoint by an external compiler
//! - an optional portable runtime binary and a license file
//!
//! It can be used both as a CLI tool and as a library dependency.

pub mod bundler;
pub mod cli;
pub mod error;

// Re-export commonly used types
pub use error::{BundlerError, CliError, Result};
