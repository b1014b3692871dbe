//! Download a zip artifact, extract it, and always remove the archive.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::errors::{Result, ResultExt};
use crate::net::HttpClient;
use crate::paths::{invocation_dir, UPDATE_TOOL_EXE};
use crate::task::Task;
use crate::types::{BuildVariant, DownloadedBuild, DownloadedUpdateTool};

use super::unzip::unzip_into;

/// Archive file name inside each invocation directory.
pub const ARCHIVE_FILE: &str = "download.zip";
/// Extraction target inside each invocation directory.
pub const EXTRACT_DIR: &str = "extracted";

/// Removes the temporary archive when dropped, whatever happened in between.
struct TempArchive<'a>(&'a Path);

impl Drop for TempArchive<'_> {
    fn drop(&mut self) {
        tracing::info!("deleting {}", self.0.display());
        match fs::remove_file(self.0) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("failed to delete {}: {e}", self.0.display()),
        }
    }
}

/// Fetch `url`, save it as `<dir>/download.zip`, extract into `<dir>/extracted`.
/// Returns the extraction directory.
pub fn download_and_extract(client: &dyn HttpClient, url: &str, dir: &Path) -> Result<PathBuf> {
    tracing::info!("downloading {url}...");
    let data = client
        .get_bytes(url)
        .with_context(|| format!("failed to download {url}"))?;

    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create directory {}", dir.display()))?;

    let zip_path = dir.join(ARCHIVE_FILE);
    let _cleanup = TempArchive(&zip_path);

    tracing::info!("saving zip to {}...", zip_path.display());
    fs::write(&zip_path, &data)
        .with_context(|| format!("failed to save {}", zip_path.display()))?;

    let extract_dir = dir.join(EXTRACT_DIR);
    tracing::info!(
        "extracting {} to {}...",
        zip_path.display(),
        extract_dir.display()
    );
    unzip_into(&zip_path, &extract_dir).context("failed to extract archive entries")?;

    Ok(extract_dir)
}

/// Download and extract the portable build for `tool` in the background.
pub fn download_build(
    client: Arc<dyn HttpClient>,
    root: &Path,
    tool: BuildVariant,
    updater: BuildVariant,
) -> Task<DownloadedBuild> {
    let dir = invocation_dir(root, "tool");

    Task::spawn("tf2bd-download-build", move || {
        let extracted_location = download_and_extract(client.as_ref(), &tool.download_url, &dir)?;
        Ok(DownloadedBuild {
            updater_variant: updater,
            extracted_location,
        })
    })
}

/// Download and extract the update tool in the background.
pub fn download_update_tool(
    client: Arc<dyn HttpClient>,
    root: &Path,
    updater: BuildVariant,
    args: String,
) -> Task<DownloadedUpdateTool> {
    let dir = invocation_dir(root, "updater");

    Task::spawn("tf2bd-download-updater", move || {
        let extracted = download_and_extract(client.as_ref(), &updater.download_url, &dir)?;
        Ok(DownloadedUpdateTool {
            path: extracted.join(UPDATE_TOOL_EXE),
            arguments: args,
        })
    })
}
