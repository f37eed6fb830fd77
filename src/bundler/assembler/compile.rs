//! Compiler invocation and entrypoint rename.
//!
//! The compiler is an opaque external command run inside staging. It learns
//! what to do from the environment:
//!
//! | variable | value |
//! |---|---|
//! | `BUNDLE_ENTRY` | absolute path of the staged entrypoint |
//! | `BUNDLE_OUTPUT` | absolute path it must write (`staging/bundle.js`) |
//! | `BUNDLE_EXTERNALS` | comma-separated modules to leave as runtime `require`s |
//! | `BUNDLE_MODULES_DIR` | staged dependency directory |
//! | `BUNDLE_ROOT` | staging root |

use super::Assembler;
use crate::{
    bail,
    bundler::{
        error::{Error, ErrorExt, Result},
        utils::{fs, process},
    },
};
use std::{
    collections::BTreeSet,
    ffi::OsString,
    path::{Path, PathBuf},
};

/// File the compiler writes, relative to the staging root.
pub const COMPILED_OUTPUT: &str = "bundle.js";

/// Separator between names in `BUNDLE_EXTERNALS`.
pub const EXTERNALS_SEPARATOR: char = ',';

/// Lists installed modules under `modules_dir` that are not embedded.
///
/// Scoped directories (`@scope`) are expanded to `@scope/name`; dot entries
/// such as `.bin` are skipped. A missing directory yields no externals.
pub async fn scan_externals(modules_dir: &Path, embedded: &BTreeSet<&str>) -> Result<Vec<String>> {
    let mut externals = BTreeSet::new();

    let mut entries = match tokio::fs::read_dir(modules_dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e).fs_context("reading dependency directory", modules_dir),
    };

    while let Some(entry) = entries
        .next_entry()
        .await
        .fs_context("reading dependency directory", modules_dir)?
    {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }

        if name.starts_with('@') && entry.path().is_dir() {
            let scope_dir = entry.path();
            let mut scoped = tokio::fs::read_dir(&scope_dir)
                .await
                .fs_context("reading scope directory", &scope_dir)?;
            while let Some(member) = scoped
                .next_entry()
                .await
                .fs_context("reading scope directory", &scope_dir)?
            {
                externals.insert(format!("{}/{}", name, member.file_name().to_string_lossy()));
            }
        } else {
            externals.insert(name);
        }
    }

    Ok(externals
        .into_iter()
        .filter(|name| !embedded.contains(name.as_str()))
        .collect())
}

impl Assembler {
    /// Staged path of the compiler's output.
    pub fn compiled_output(&self) -> PathBuf {
        self.staging_dir.join(COMPILED_OUTPUT)
    }

    /// Staged path of the entrypoint.
    pub fn staged_entrypoint(&self) -> PathBuf {
        self.staging_dir.join(self.spec.entrypoint())
    }

    /// Runs the compiler on the staged entrypoint.
    ///
    /// Everything installed in staging is external except embedded packages,
    /// which were never installed there and must be compiled in.
    pub async fn compile_entrypoint(&self) -> Result<()> {
        let compiler = self.spec.compiler().ok_or_else(|| {
            Error::Config("compile-entrypoint requires a compiler command".into())
        })?;

        let entry = self.staged_entrypoint();
        if !entry.is_file() {
            bail!(
                "entrypoint {} was not copied into staging; check the source patterns",
                entry.display()
            );
        }

        let embedded: BTreeSet<&str> = self
            .spec
            .embedded_packages()
            .keys()
            .map(String::as_str)
            .collect();
        let externals = scan_externals(&self.staged_modules_dir(), &embedded).await?;
        log::info!(
            "Compiling {} with {} external module(s)",
            self.spec.entrypoint(),
            externals.len()
        );
        log::debug!("Externals: {:?}", externals);

        let output = self.compiled_output();
        fs::remove_file(&output).await?;

        let envs = self.compiler_env(&entry, &output, &externals);
        process::run_tool(
            compiler,
            &[],
            &self.staging_dir,
            &envs,
            self.spec.timeouts().compile,
        )
        .await?;

        if !output.is_file() {
            return Err(Error::Subprocess {
                command: compiler.to_string(),
                status: "exit status: 0".to_string(),
                stderr: format!("compiler did not produce {}", output.display()),
            });
        }
        Ok(())
    }

    fn compiler_env(
        &self,
        entry: &Path,
        output: &Path,
        externals: &[String],
    ) -> Vec<(&'static str, OsString)> {
        let separator = EXTERNALS_SEPARATOR.to_string();
        vec![
            ("BUNDLE_ENTRY", entry.into()),
            ("BUNDLE_OUTPUT", output.into()),
            ("BUNDLE_EXTERNALS", externals.join(&separator).into()),
            ("BUNDLE_MODULES_DIR", self.staged_modules_dir().into()),
            ("BUNDLE_ROOT", self.staging_dir.clone().into()),
        ]
    }

    /// Moves the compiled output onto the entrypoint path.
    pub async fn rename_compiled_entrypoint(&self) -> Result<()> {
        let output = self.compiled_output();
        let entry = self.staged_entrypoint();
        if output == entry {
            return Ok(());
        }
        if !output.is_file() {
            bail!(
                "compiled output {} is missing; run compile-entrypoint first",
                output.display()
            );
        }
        fs::remove_path(&entry).await?;
        fs::rename(&output, &entry).await?;
        log::debug!("Renamed {} to {}", output.display(), entry.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn externals_skip_embedded_and_dot_entries() {
        let dir = tempfile::tempdir().unwrap();
        let modules = dir.path().join("node_modules");
        for name in ["x", "y", ".bin", "@scope/a", "@scope/b", "@emb/inner"] {
            std::fs::create_dir_all(modules.join(name)).unwrap();
        }

        let embedded: BTreeSet<&str> = ["y", "@emb/inner"].into_iter().collect();
        let externals = scan_externals(&modules, &embedded).await.unwrap();

        assert_eq!(externals, vec!["@scope/a", "@scope/b", "x"]);
    }

    #[tokio::test]
    async fn missing_modules_dir_has_no_externals() {
        let dir = tempfile::tempdir().unwrap();
        let externals = scan_externals(&dir.path().join("node_modules"), &BTreeSet::new())
            .await
            .unwrap();
        assert!(externals.is_empty());
    }
}
