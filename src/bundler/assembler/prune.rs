//! Deletion stages run after compiling and after bundling.

use super::Assembler;
use crate::bundler::{
    builder::Variant,
    error::{Error, Result},
    globs::Selector,
    utils::fs,
};
use std::path::PathBuf;

impl Assembler {
    /// Deletes sources the compiled output replaces.
    ///
    /// Removes staged paths matching the post-compile filter, except the
    /// compiled output and the dependency directory, then every embedded
    /// package's staged directory.
    pub async fn prune_compiled_sources(&self) -> Result<()> {
        let selector = Selector::new(&self.post_compile_globs)?
            .with_pruned([self.compiled_output(), self.staged_modules_dir()]);
        let removed = self.delete_selected(selector).await?;
        let packages = self.remove_embedded_dirs().await?;
        log::info!(
            "Pruned {} compiled source path(s) and {} embedded package dir(s)",
            removed,
            packages
        );
        Ok(())
    }

    /// Deletes staged paths matching the post-bundle filter.
    ///
    /// In the full variant the embedded package directories are removed as
    /// well, whether or not pruning already did.
    pub async fn apply_post_filter(&self) -> Result<()> {
        let selector = Selector::new(&self.post_bundle_globs)?;
        let removed = self.delete_selected(selector).await?;
        if self.spec.variant() == Variant::Full {
            self.remove_embedded_dirs().await?;
        }
        log::info!("Post-bundle filter removed {} path(s)", removed);
        Ok(())
    }

    async fn delete_selected(&self, selector: Selector) -> Result<usize> {
        if selector.is_empty() {
            return Ok(0);
        }
        let doomed: Vec<PathBuf> = tokio::task::spawn_blocking(move || selector.entries())
            .await
            .map_err(|e| Error::GenericError(format!("File selection task panicked: {e}")))??;

        for path in &doomed {
            if !path.starts_with(&self.staging_dir) || path == &self.staging_dir {
                log::warn!("Refusing to delete {} outside staging", path.display());
                continue;
            }
            log::debug!("Deleting {}", path.display());
            fs::remove_path(path).await?;
        }
        Ok(doomed.len())
    }

    async fn remove_embedded_dirs(&self) -> Result<usize> {
        let mut removed = 0;
        for dir in &self.embedded_staged_dirs {
            if dir.exists() {
                fs::remove_dir_all(dir).await?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}
