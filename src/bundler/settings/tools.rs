//! External tool commands and their time budgets.

use std::{fmt, time::Duration};

/// An external program plus the leading arguments it is always called with.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct ToolCommand {
    /// Program name (looked up on `PATH`) or a path relative to the project.
    pub program: String,

    /// Arguments placed before any stage-specific ones.
    #[serde(default)]
    pub args: Vec<String>,
}

impl ToolCommand {
    /// Command with no leading arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Appends a leading argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// `npm install`, the default dependency installer.
    pub fn npm_install() -> Self {
        Self::new("npm").arg("install")
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Time budgets for blocking external operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Each dependency installer run.
    pub install: Duration,
    /// The compiler run.
    pub compile: Duration,
    /// The runtime download.
    pub download: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            install: Duration::from_secs(600),
            compile: Duration::from_secs(600),
            download: Duration::from_secs(300),
        }
    }
}
