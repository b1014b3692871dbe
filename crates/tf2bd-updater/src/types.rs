use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::errors::UpdateError;
use crate::version::Version;

/// Operating systems a build can target. Spelling matches the manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Os {
    Windows,
    Linux,
    MacOS,
    /// Anything this build does not know about; never matches the running platform.
    #[serde(other)]
    Other,
}

/// CPU architectures a build can target. Spelling matches the manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    X86,
    X64,
    Arm64,
    Arm,
    #[serde(other)]
    Other,
}

/// Which update track to follow. `None` turns update checks off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReleaseChannel {
    None,
    #[default]
    Public,
    Preview,
    Nightly,
}

impl ReleaseChannel {
    pub fn as_str(self) -> &'static str {
        match self {
            ReleaseChannel::None => "None",
            ReleaseChannel::Public => "Public",
            ReleaseChannel::Preview => "Preview",
            ReleaseChannel::Nightly => "Nightly",
        }
    }

    pub fn is_enabled(self) -> bool {
        self != ReleaseChannel::None
    }
}

impl fmt::Display for ReleaseChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReleaseChannel {
    type Err = UpdateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "disabled" => Ok(ReleaseChannel::None),
            "public" | "stable" => Ok(ReleaseChannel::Public),
            "preview" => Ok(ReleaseChannel::Preview),
            "nightly" => Ok(ReleaseChannel::Nightly),
            other => Err(UpdateError::Configuration(format!(
                "unknown release channel: {other}"
            ))),
        }
    }
}

/// One platform-specific download entry in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildVariant {
    pub os: Os,
    pub arch: Arch,
    pub download_url: String,
}

/// Remote descriptor of the latest version on a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildInfo {
    pub version: Version,
    #[serde(rename = "build_type")]
    pub release_channel: ReleaseChannel,
    #[serde(default)]
    pub github_url: String,
    #[serde(default)]
    pub msix_bundle_url: String,
    /// Update tool builds, one per platform.
    pub updater: Vec<BuildVariant>,
    /// Portable application builds, one per platform.
    pub portable: Vec<BuildVariant>,
}

/// Status broadcast to observers of the update pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpdateStatus {
    #[default]
    Unknown,

    CheckQueued,
    UpdateCheckDisabled,
    InternetAccessDisabled,
    Checking,
    CheckFailed,
    UpToDate,
    UpdateAvailable,

    Downloading,
    DownloadFailed,
    DownloadSuccess,

    UpdateToolRequired,
    UpdateToolDownloading,
    UpdateToolDownloadFailed,
    UpdateToolDownloadSuccess,

    Updating,
    UpdateFailed,
    UpdateSuccess,
}

impl UpdateStatus {
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            UpdateStatus::CheckFailed
                | UpdateStatus::DownloadFailed
                | UpdateStatus::UpdateToolDownloadFailed
                | UpdateStatus::UpdateFailed
        )
    }
}

/// Outcome reported by the platform's native installer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallResult {
    Success,
    /// The installer was started but gives no completion signal.
    StartedNoFeedback,
    /// The platform cannot finish on its own; run the update tool with these arguments.
    NeedsUpdateTool { args: String },
}

/// A portable build that has been downloaded and extracted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedBuild {
    pub updater_variant: BuildVariant,
    pub extracted_location: PathBuf,
}

/// An update tool that has been downloaded and is ready to launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedUpdateTool {
    pub path: PathBuf,
    pub arguments: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateToolResult {
    pub success: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"{
        "version": "1.3.0.512",
        "build_type": "Preview",
        "github_url": "https://github.com/PazerOP/tf2_bot_detector/releases/tag/v1.3.0.512",
        "updater": [
            { "os": "Windows", "arch": "x64", "download_url": "https://example.invalid/updater_x64.zip" }
        ],
        "portable": [
            { "os": "Windows", "arch": "x86", "download_url": "https://example.invalid/portable_x86.zip" },
            { "os": "Linux", "arch": "x64", "download_url": "https://example.invalid/portable_linux.zip" }
        ]
    }"#;

    #[test]
    fn decodes_manifest_with_defaults() {
        let info: BuildInfo = serde_json::from_str(MANIFEST).unwrap();
        assert_eq!(info.version, Version::with_build(1, 3, 0, 512));
        assert_eq!(info.release_channel, ReleaseChannel::Preview);
        assert!(info.msix_bundle_url.is_empty());
        assert_eq!(info.updater.len(), 1);
        assert_eq!(info.portable[1].os, Os::Linux);
        assert_eq!(info.portable[0].arch, Arch::X86);
    }

    #[test]
    fn missing_required_list_is_an_error() {
        let json = r#"{ "version": "1.0.0", "build_type": "Public", "portable": [] }"#;
        assert!(serde_json::from_str::<BuildInfo>(json).is_err());
    }

    #[test]
    fn unknown_platform_names_do_not_break_decoding() {
        let json = r#"{ "os": "Haiku", "arch": "riscv64", "download_url": "x" }"#;
        let v: BuildVariant = serde_json::from_str(json).unwrap();
        assert_eq!(v.os, Os::Other);
        assert_eq!(v.arch, Arch::Other);
    }

    #[test]
    fn release_channel_parses_loosely() {
        assert_eq!("public".parse::<ReleaseChannel>().unwrap(), ReleaseChannel::Public);
        assert_eq!("NIGHTLY".parse::<ReleaseChannel>().unwrap(), ReleaseChannel::Nightly);
        assert_eq!("none".parse::<ReleaseChannel>().unwrap(), ReleaseChannel::None);
        assert!("beta".parse::<ReleaseChannel>().is_err());
        assert_eq!(ReleaseChannel::Preview.to_string(), "Preview");
    }
}
