use chrono::Utc;
use dirs::config_dir;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::errors::{Result, ResultExt, UpdateError};

const APP_DIR: &str = "TF2 Bot Detector";

/// File name of the update tool inside its extracted archive.
#[cfg(target_os = "windows")]
pub const UPDATE_TOOL_EXE: &str = "tf2_bot_detector_updater.exe";
#[cfg(not(target_os = "windows"))]
pub const UPDATE_TOOL_EXE: &str = "tf2_bot_detector_updater";

/// <temp>/TF2 Bot Detector/Portable Updates
pub fn default_download_root() -> PathBuf {
    std::env::temp_dir().join(APP_DIR).join("Portable Updates")
}

/// <config dir>/TF2 Bot Detector/updater.json   (or <temp> if there is none)
pub fn default_config_path() -> PathBuf {
    config_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
        .join("updater.json")
}

/// Directory holding the running executable; portable updates land here.
pub fn current_exe_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("cannot determine current executable path")?;
    exe.parent().map(Path::to_path_buf).ok_or_else(|| {
        UpdateError::Configuration(format!("executable {} has no parent", exe.display()))
    })
}

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// <root>/<prefix>_<unix nanos>_<seq>
///
/// One directory per download so overlapping tasks never share files.
pub fn invocation_dir(root: &Path, prefix: &str) -> PathBuf {
    let nanos = Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_else(|| Utc::now().timestamp_micros().saturating_mul(1000));
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    root.join(format!("{prefix}_{nanos}_{seq}"))
}
