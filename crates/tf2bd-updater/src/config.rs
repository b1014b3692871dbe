//! Updater settings, loaded from JSON with environment overrides.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{Result, ResultExt};
use crate::manifest::{manifest_url, DEFAULT_MANIFEST_URL};
use crate::paths;
use crate::types::ReleaseChannel;

pub const ENV_MANIFEST_URL: &str = "TF2BD_UPDATE_MANIFEST";
pub const ENV_RELEASE_CHANNEL: &str = "TF2BD_RELEASE_CHANNEL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdaterConfig {
    pub release_channel: ReleaseChannel,
    /// Manifest URL template; `{channel}` is replaced by the channel name.
    pub manifest_url: String,
    pub download_root: Option<PathBuf>,
    /// Where portable updates are installed. Defaults to the executable's directory.
    pub install_dir: Option<PathBuf>,
    pub check_on_startup: bool,
    pub allow_internet: bool,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            release_channel: ReleaseChannel::default(),
            manifest_url: DEFAULT_MANIFEST_URL.to_string(),
            download_root: None,
            install_dir: None,
            check_on_startup: true,
            allow_internet: true,
        }
    }
}

impl UpdaterConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let bytes =
            fs::read(path).with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_slice::<Self>(&bytes)
            .with_context(|| format!("invalid config JSON in {}", path.display()))
    }

    /// Load `path` (or the default location). A missing file gives defaults;
    /// a present but unreadable one is an error. Environment overrides apply last.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(paths::default_config_path);
        let mut cfg = if path.exists() {
            Self::load(&path)?
        } else {
            tracing::debug!("no config at {}, using defaults", path.display());
            Self::default()
        };
        cfg.apply_env_overrides()?;
        Ok(cfg)
    }

    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(
            std::env::var(ENV_MANIFEST_URL).ok(),
            std::env::var(ENV_RELEASE_CHANNEL).ok(),
        )
    }

    fn apply_overrides(&mut self, url: Option<String>, channel: Option<String>) -> Result<()> {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            self.manifest_url = url;
        }
        if let Some(channel) = channel.filter(|c| !c.trim().is_empty()) {
            self.release_channel = channel.parse()?;
        }
        Ok(())
    }

    pub fn download_root(&self) -> PathBuf {
        self.download_root
            .clone()
            .unwrap_or_else(paths::default_download_root)
    }

    pub fn install_dir(&self) -> Result<PathBuf> {
        match &self.install_dir {
            Some(dir) => Ok(dir.clone()),
            None => paths::current_exe_dir(),
        }
    }

    pub fn manifest_url_for(&self, channel: ReleaseChannel) -> String {
        manifest_url(&self.manifest_url, channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: UpdaterConfig = serde_json::from_str(r#"{ "release_channel": "Nightly" }"#).unwrap();
        assert_eq!(cfg.release_channel, ReleaseChannel::Nightly);
        assert_eq!(cfg.manifest_url, DEFAULT_MANIFEST_URL);
        assert!(cfg.check_on_startup);
        assert!(cfg.allow_internet);
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = UpdaterConfig::load_or_default(Some(&dir.path().join("absent.json")));
        // Env overrides may be set by the harness; only the file fallback matters here.
        assert!(cfg.is_ok());
    }

    #[test]
    fn load_reads_file_and_reports_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.json");
        fs::write(&good, r#"{ "allow_internet": false, "install_dir": "/opt/tf2bd" }"#).unwrap();
        let cfg = UpdaterConfig::load(&good).unwrap();
        assert!(!cfg.allow_internet);
        assert_eq!(cfg.install_dir().unwrap(), PathBuf::from("/opt/tf2bd"));

        let bad = dir.path().join("bad.json");
        fs::write(&bad, "{ not json").unwrap();
        let err = UpdaterConfig::load(&bad).unwrap_err();
        assert_eq!(err.category(), "decode");
    }

    #[test]
    fn overrides_replace_url_and_channel() {
        let mut cfg = UpdaterConfig::default();
        cfg.apply_overrides(
            Some("https://mirror.invalid/{channel}.json".into()),
            Some("preview".into()),
        )
        .unwrap();
        assert_eq!(cfg.release_channel, ReleaseChannel::Preview);
        assert_eq!(
            cfg.manifest_url_for(cfg.release_channel),
            "https://mirror.invalid/Preview.json"
        );

        assert!(cfg.apply_overrides(None, Some("bogus".into())).is_err());
    }
}
