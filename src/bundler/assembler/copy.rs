//! Copy stages: application sources and embedded packages.

use super::Assembler;
use crate::bundler::{
    error::{Error, Result},
    globs::Selector,
    utils::fs,
};

impl Assembler {
    /// Copies files matching the source patterns into staging, keeping their
    /// project-relative layout. The build directory is never selected.
    pub async fn copy_sources(&self) -> Result<()> {
        let selector = Selector::new(&self.source_globs)?
            .with_pruned([self.spec.build_dir().to_path_buf()]);
        let copied = self.copy_selected(selector).await?;
        log::info!("Copied {} source file(s) into staging", copied);
        Ok(())
    }

    /// Copies embedded package files into `staging/node_modules/<package>`.
    pub async fn copy_embedded_packages(&self) -> Result<()> {
        let selector = Selector::new(&self.embedded_globs)?
            .with_pruned([self.spec.build_dir().to_path_buf()]);
        let copied = self.copy_selected(selector).await?;
        log::info!(
            "Copied {} file(s) from {} embedded package(s)",
            copied,
            self.spec.embedded_packages().len()
        );
        Ok(())
    }

    async fn copy_selected(&self, selector: Selector) -> Result<usize> {
        let files = tokio::task::spawn_blocking(move || selector.files())
            .await
            .map_err(|e| Error::GenericError(format!("File selection task panicked: {e}")))??;

        fs::create_dir_all(&self.staging_dir, false).await?;
        fs::copy_relative(files, self.spec.project_dir(), &self.staging_dir).await
    }
}
