//! Dependency installation and manifest merging stages.

use super::Assembler;
use crate::bundler::{
    builder::Variant,
    error::Result,
    manifest::{self, MANIFEST_FILE, PackageManifest},
    utils::{fs, process},
};
use std::path::Path;

/// Installer flag limiting installation to runtime dependencies.
const PRODUCTION_FLAG: &str = "--production";

impl Assembler {
    /// Installs the project's dependencies in the project root.
    ///
    /// Embedded packages are copied from the project's install directory, so
    /// they must be present before the copy stages run.
    pub async fn preinstall_project_deps(&self) -> Result<()> {
        self.run_installer(self.spec.project_dir(), false).await
    }

    /// Writes the merged manifest to `staging/package.json`.
    pub async fn merge_dependency_manifest(&self) -> Result<()> {
        let project_manifest = self.spec.project_dir().join(MANIFEST_FILE);
        let project = PackageManifest::read(&project_manifest).await?;
        let embedded = manifest::load_embedded_manifests(
            self.spec.project_dir(),
            self.spec.embedded_packages().keys(),
        )
        .await?;

        let merged = manifest::merge_manifests(&project, &embedded)?;
        fs::create_dir_all(&self.staging_dir, false).await?;
        merged.write(&self.staged_manifest()).await?;

        log::info!(
            "Merged {} embedded manifest(s) into {}",
            embedded.len(),
            self.staged_manifest().display()
        );
        Ok(())
    }

    /// Installs production dependencies inside staging.
    ///
    /// The full variant installs from the merged manifest. The minimal variant
    /// installs the project's declared dependencies, writing the project
    /// manifest minus its development sections into staging when the sources
    /// did not bring it along.
    pub async fn install_staged_deps(&self) -> Result<()> {
        let staged = self.staged_manifest();
        if self.spec.variant() == Variant::Minimal && !staged.exists() {
            let project = PackageManifest::read(&self.spec.project_dir().join(MANIFEST_FILE)).await?;
            log::debug!(
                "Sources did not include {}, writing its production subset into staging",
                MANIFEST_FILE
            );
            fs::create_dir_all(&self.staging_dir, false).await?;
            manifest::production_manifest(&project)?.write(&staged).await?;
        }

        self.run_installer(&self.staging_dir, true).await
    }

    async fn run_installer(&self, dir: &Path, production: bool) -> Result<()> {
        let mut args = Vec::new();
        if production {
            args.push(PRODUCTION_FLAG.to_string());
        }
        if let Some(registry) = self.spec.registry_url() {
            args.push("--registry".to_string());
            args.push(registry.to_string());
        }

        log::info!(
            "Installing dependencies in {} with `{}`",
            dir.display(),
            self.spec.installer()
        );
        process::run_tool(
            self.spec.installer(),
            &args,
            dir,
            &[],
            self.spec.timeouts().install,
        )
        .await?;
        Ok(())
    }
}
