//! Command line argument parsing.
//!
//! This module provides CLI argument parsing using clap, and folds the
//! arguments together with an optional config file into a
//! [`BundleSpecBuilder`].

use super::config::FileConfig;
use crate::{
    bundler::{BundleSpecBuilder, RuntimeSpec, Stage, ToolCommand},
    error::{CliError, Result},
};
use clap::Parser;
use std::{path::PathBuf, time::Duration};

/// Release bundler for Node.js applications
#[derive(Parser, Debug)]
#[command(
    name = "kodegen_bundler_node",
    version,
    about = "Release bundler for Node.js applications",
    long_about = "Stages a Node.js application's sources and production dependencies, \
optionally compiles the entrypoint and embeds a runtime binary, and writes \
<build-dir>/<artifact-name>.tar.gz.

Usage:
  kodegen_bundler_node --artifact-name app --source '**/*.js' --source '!node_modules/**'
  kodegen_bundler_node --config bundle.toml --runtime-version 18.19.0
  kodegen_bundler_node --config bundle.toml --stage copy-sources

Exit code 0 = archive written. On failure the message names the failed stage."
)]
pub struct Args {
    /// TOML config file; command line flags override its values
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Project root (default: current directory)
    #[arg(short, long, value_name = "DIR")]
    pub project_dir: Option<PathBuf>,

    /// Output root, relative to the project (default: build)
    #[arg(short, long, value_name = "DIR")]
    pub build_dir: Option<PathBuf>,

    /// Archive base name and its top-level directory
    #[arg(short, long, value_name = "NAME")]
    pub artifact_name: Option<String>,

    /// Source pattern relative to the project; prefix with ! to exclude
    #[arg(short, long = "source", value_name = "PATTERN", allow_hyphen_values = true)]
    pub sources: Vec<String>,

    /// Package compiled into the entrypoint, with its file patterns
    #[arg(short, long, value_name = "NAME=PATTERN[,PATTERN]", value_parser = parse_embed)]
    pub embed: Vec<(String, Vec<String>)>,

    /// Entry module relative to the project (default: index.js)
    #[arg(long, value_name = "PATH")]
    pub entrypoint: Option<String>,

    /// Pattern deleted from staging after bundling
    #[arg(long, value_name = "PATTERN")]
    pub post_bundle_filter: Vec<String>,

    /// Pattern deleted from staging after compiling (default: the source patterns)
    #[arg(long, value_name = "PATTERN")]
    pub post_compile_filter: Vec<String>,

    /// Runtime download URL
    #[arg(long, value_name = "URL", conflicts_with = "runtime_version")]
    pub runtime_url: Option<String>,

    /// Node.js version to embed as the runtime
    #[arg(long, value_name = "VERSION")]
    pub runtime_version: Option<String>,

    /// File name of the runtime inside the archive (default: node)
    #[arg(long, value_name = "NAME")]
    pub runtime_name: Option<String>,

    /// Directory under the archive root for the runtime (default: runtime)
    #[arg(long, value_name = "DIR")]
    pub runtime_dir: Option<String>,

    /// Registry URL passed to the installer
    #[arg(long, value_name = "URL")]
    pub registry: Option<String>,

    /// Compiler command; enables the full pipeline
    #[arg(long, value_name = "PROGRAM")]
    pub compiler: Option<String>,

    /// Leading argument for the compiler
    #[arg(long, value_name = "ARG", allow_hyphen_values = true)]
    pub compiler_arg: Vec<String>,

    /// Installer command line (default: "npm install")
    #[arg(long, value_name = "COMMAND")]
    pub installer: Option<String>,

    /// License file (default: first of COPYING, LICENSE, LICENSE.md, LICENSE.txt)
    #[arg(long, value_name = "FILE")]
    pub license: Option<PathBuf>,

    /// Installer time budget in seconds
    #[arg(long, value_name = "SECS")]
    pub install_timeout: Option<u64>,

    /// Compiler time budget in seconds
    #[arg(long, value_name = "SECS")]
    pub compile_timeout: Option<u64>,

    /// Runtime download time budget in seconds
    #[arg(long, value_name = "SECS")]
    pub download_timeout: Option<u64>,

    /// Run only this stage
    #[arg(long, value_enum, value_name = "STAGE")]
    pub stage: Option<Stage>,
}

/// Default output root under the project.
pub const DEFAULT_BUILD_DIR: &str = "build";

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Loads the config file, if any, and layers the flags over it.
    pub fn to_builder(&self) -> Result<BundleSpecBuilder> {
        let config = match &self.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        self.merge(config)
    }

    /// Layers the flags over `config`.
    pub fn merge(&self, config: FileConfig) -> Result<BundleSpecBuilder> {
        let artifact_name = self
            .artifact_name
            .clone()
            .or(config.artifact_name)
            .ok_or_else(|| CliError::MissingArgument {
                argument: "--artifact-name".into(),
            })?;

        let project_dir = self
            .project_dir
            .clone()
            .or(config.project_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        let build_dir = self
            .build_dir
            .clone()
            .or(config.build_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BUILD_DIR));

        let sources = if self.sources.is_empty() {
            config.sources
        } else {
            self.sources.clone()
        };

        let mut builder = BundleSpecBuilder::new()
            .project_dir(project_dir)
            .build_dir(build_dir)
            .artifact_name(artifact_name)
            .source_patterns(sources);

        let embedded = if self.embed.is_empty() {
            config.embed.into_iter().collect()
        } else {
            self.embed.clone()
        };
        for (package, patterns) in embedded {
            builder = builder.embed_package(package, patterns);
        }

        if let Some(entrypoint) = self.entrypoint.clone().or(config.entrypoint) {
            builder = builder.entrypoint(entrypoint);
        }
        if let Some(filter) = non_empty(&self.post_bundle_filter).or(config.post_bundle_filter) {
            builder = builder.post_bundle_filter(filter);
        }
        if let Some(filter) = non_empty(&self.post_compile_filter).or(config.post_compile_filter) {
            builder = builder.post_compile_filter(filter);
        }

        if let Some(runtime) = self.runtime(config.runtime) {
            builder = builder.runtime(runtime);
        }
        if let Some(registry) = self.registry.clone().or(config.registry) {
            builder = builder.registry_url(registry);
        }

        let compiler = match &self.compiler {
            Some(program) => Some(parse_command(program)?),
            None => config.compiler,
        };
        if let Some(mut compiler) = compiler {
            compiler.args.extend(self.compiler_arg.iter().cloned());
            builder = builder.compiler(compiler);
        } else if !self.compiler_arg.is_empty() {
            return Err(CliError::InvalidArguments {
                reason: "--compiler-arg requires a compiler".into(),
            }
            .into());
        }

        let installer = match &self.installer {
            Some(command) => Some(parse_command(command)?),
            None => config.installer,
        };
        if let Some(installer) = installer {
            builder = builder.installer(installer);
        }

        if let Some(license) = self.license.clone().or(config.license) {
            builder = builder.license_file(license);
        }

        let mut timeouts = config.timeouts.apply(Default::default());
        if let Some(secs) = self.install_timeout {
            timeouts.install = Duration::from_secs(secs);
        }
        if let Some(secs) = self.compile_timeout {
            timeouts.compile = Duration::from_secs(secs);
        }
        if let Some(secs) = self.download_timeout {
            timeouts.download = Duration::from_secs(secs);
        }
        Ok(builder.timeouts(timeouts))
    }

    /// Runtime flags layered over the configured runtime.
    ///
    /// A name or directory without any URL source still yields a descriptor,
    /// which [`BundleSpecBuilder::build`] then rejects.
    fn runtime(&self, configured: Option<RuntimeSpec>) -> Option<RuntimeSpec> {
        let mut runtime = match (&self.runtime_url, &self.runtime_version) {
            (Some(url), _) => {
                let mut runtime = configured.unwrap_or_else(|| RuntimeSpec::from_url(url, "node"));
                runtime.url = Some(url.clone());
                runtime.version = None;
                runtime
            }
            (None, Some(version)) => {
                let mut runtime = configured.unwrap_or_else(|| RuntimeSpec::node(version));
                runtime.url = None;
                runtime.version = Some(version.clone());
                runtime
            }
            (None, None) => match configured {
                Some(runtime) => runtime,
                None if self.runtime_name.is_some() || self.runtime_dir.is_some() => RuntimeSpec {
                    url: None,
                    version: None,
                    binary_name: String::new(),
                    dest_subdir: crate::bundler::settings::DEFAULT_RUNTIME_DIR.to_string(),
                    archive_member: None,
                },
                None => return None,
            },
        };

        if let Some(name) = &self.runtime_name {
            runtime.binary_name = name.clone();
        }
        if let Some(dir) = &self.runtime_dir {
            runtime.dest_subdir = dir.clone();
        }
        Some(runtime)
    }
}

fn non_empty(patterns: &[String]) -> Option<Vec<String>> {
    (!patterns.is_empty()).then(|| patterns.to_vec())
}

/// Splits a command line on whitespace into program and leading arguments.
fn parse_command(command: &str) -> Result<ToolCommand> {
    let mut words = command.split_whitespace();
    let program = words.next().ok_or_else(|| CliError::InvalidArguments {
        reason: format!("empty command `{command}`"),
    })?;
    Ok(words.fold(ToolCommand::new(program), |tool, word| tool.arg(word)))
}

/// Parses `NAME=PATTERN[,PATTERN]`; a bare `NAME` embeds every file.
fn parse_embed(value: &str) -> std::result::Result<(String, Vec<String>), String> {
    let (name, patterns) = match value.split_once('=') {
        Some((name, patterns)) => (name.trim(), patterns),
        None => (value.trim(), "**"),
    };
    if name.is_empty() {
        return Err(format!("missing package name in `{value}`"));
    }
    let patterns: Vec<String> = patterns
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect();
    if patterns.is_empty() {
        return Err(format!("no patterns for package `{name}`"));
    }
    Ok((name.to_string(), patterns))
}
