//! Running-platform identity and the installed-mode adapter seam.

use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::errors::UpdateError;
use crate::net::HttpClient;
use crate::task::Task;
use crate::types::{Arch, BuildInfo, InstallResult, Os};

/// The (OS, architecture) pair this binary was built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
    pub os: Os,
    pub arch: Arch,
}

static CURRENT: Lazy<Platform> = Lazy::new(|| Platform {
    os: current_os(),
    arch: current_arch(),
});

impl Platform {
    pub fn current() -> Platform {
        *CURRENT
    }
}

fn current_os() -> Os {
    if cfg!(target_os = "windows") {
        Os::Windows
    } else if cfg!(target_os = "macos") {
        Os::MacOS
    } else if cfg!(target_os = "linux") {
        Os::Linux
    } else {
        Os::Other
    }
}

fn current_arch() -> Arch {
    if cfg!(target_arch = "x86_64") {
        Arch::X64
    } else if cfg!(target_arch = "x86") {
        Arch::X86
    } else if cfg!(target_arch = "aarch64") {
        Arch::Arm64
    } else if cfg!(target_arch = "arm") {
        Arch::Arm
    } else {
        Arch::Other
    }
}

/// OS-native install integration (package managers, app installers).
///
/// Portable builds use [`PortablePlatform`], which reports "not installed" so
/// the manager takes the download-and-replace path instead.
pub trait PlatformAdapter: Send + Sync {
    fn is_installed(&self) -> bool;

    fn can_install_update(&self, build: &BuildInfo) -> bool;

    /// Start the native installer in the background.
    fn begin_install_update(
        &self,
        build: &BuildInfo,
        client: Arc<dyn HttpClient>,
    ) -> Task<InstallResult>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PortablePlatform;

impl PlatformAdapter for PortablePlatform {
    fn is_installed(&self) -> bool {
        false
    }

    fn can_install_update(&self, _build: &BuildInfo) -> bool {
        false
    }

    fn begin_install_update(
        &self,
        build: &BuildInfo,
        _client: Arc<dyn HttpClient>,
    ) -> Task<InstallResult> {
        Task::ready(Err(UpdateError::Configuration(format!(
            "portable build cannot run a platform installer for v{}",
            build.version
        ))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_platform_is_known_on_ci_targets() {
        let p = Platform::current();
        if cfg!(all(target_os = "linux", target_arch = "x86_64")) {
            assert_eq!(p, Platform { os: Os::Linux, arch: Arch::X64 });
        }
        assert_eq!(p, Platform::current());
    }

    #[test]
    fn portable_platform_never_installs() {
        let info: BuildInfo = serde_json::from_str(
            r#"{ "version": "1.0.0", "build_type": "Public", "updater": [], "portable": [] }"#,
        )
        .unwrap();
        let p = PortablePlatform;
        assert!(!p.is_installed());
        assert!(!p.can_install_update(&info));
    }
}
