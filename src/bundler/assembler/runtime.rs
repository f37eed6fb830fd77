//! Runtime binary download.

use super::Assembler;
use crate::bundler::{
    error::{Error, Result},
    settings::ResolvedRuntime,
    utils::{fs, http},
};
use bytes::Bytes;
use std::io::Read;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

impl Assembler {
    /// Downloads the runtime to `staging/<dest_subdir>/<binary_name>`, mode 755.
    ///
    /// Without a configured runtime this only logs. A gzip+tar payload is
    /// unpacked and the configured member (or the first file named like the
    /// binary) is kept.
    pub async fn fetch_runtime(&self) -> Result<()> {
        let Some(runtime) = &self.runtime else {
            log::info!("No runtime configured, skipping");
            return Ok(());
        };

        let payload = http::download(runtime.url.as_str(), self.spec.timeouts().download).await?;
        let binary = if payload.starts_with(&GZIP_MAGIC) {
            let runtime = runtime.clone();
            tokio::task::spawn_blocking(move || extract_member(&payload, &runtime))
                .await
                .map_err(|e| Error::GenericError(format!("Runtime extraction task panicked: {e}")))??
        } else {
            payload
        };

        let dest_dir = self.staging_dir.join(&runtime.dest_subdir);
        fs::create_dir_all(&dest_dir, false).await?;
        let dest = dest_dir.join(&runtime.binary_name);
        tokio::fs::write(&dest, &binary)
            .await
            .map_err(|source| Error::Fs {
                context: "writing runtime".into(),
                path: dest.clone(),
                source,
            })?;
        fs::make_executable(&dest).await?;

        log::info!("✓ Added runtime {} ({} bytes)", dest.display(), binary.len());
        Ok(())
    }
}

/// Pulls the runtime binary out of a `.tar.gz` payload.
fn extract_member(payload: &[u8], runtime: &ResolvedRuntime) -> Result<Bytes> {
    let decoder = flate2::read::GzDecoder::new(payload);
    let mut archive = tar::Archive::new(decoder);

    let wanted = |path: &std::path::Path| match &runtime.archive_member {
        Some(member) => path == std::path::Path::new(member),
        None => path.file_name() == Some(std::ffi::OsStr::new(&runtime.binary_name)),
    };

    for entry in archive.entries()? {
        let mut entry = entry?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let path = entry.path()?.into_owned();
        if wanted(&path) {
            let mut contents = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut contents)?;
            log::debug!("Extracted runtime member {}", path.display());
            return Ok(Bytes::from(contents));
        }
    }

    Err(Error::Network {
        url: runtime.url.to_string(),
        reason: match &runtime.archive_member {
            Some(member) => format!("archive has no member `{member}`"),
            None => format!("archive has no file named `{}`", runtime.binary_name),
        },
    })
}
