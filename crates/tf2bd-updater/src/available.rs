//! The result of a successful version check and what we can do with it.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::errors::{Result, UpdateError};
use crate::manifest::select_native_variant;
use crate::net::HttpClient;
use crate::platform::{Platform, PlatformAdapter};
use crate::types::{BuildInfo, BuildVariant, UpdateStatus};
use crate::version::Version;

/// UpToDate when the fetched version is not newer than ours.
pub fn classify(fetched: &Version, local: &Version) -> UpdateStatus {
    match fetched.cmp(local) {
        Ordering::Greater => UpdateStatus::UpdateAvailable,
        Ordering::Less | Ordering::Equal => UpdateStatus::UpToDate,
    }
}

/// Fetched build info with the variants for this platform already picked out.
pub struct AvailableUpdate {
    pub build_info: BuildInfo,
    updater: Option<BuildVariant>,
    portable: Option<BuildVariant>,
    client: Arc<dyn HttpClient>,
}

impl AvailableUpdate {
    pub fn new(build_info: BuildInfo, client: Arc<dyn HttpClient>) -> Self {
        Self::for_platform(build_info, client, Platform::current())
    }

    pub fn for_platform(
        build_info: BuildInfo,
        client: Arc<dyn HttpClient>,
        platform: Platform,
    ) -> Self {
        let updater = select_native_variant(&build_info.updater, platform.os, platform.arch).cloned();
        let portable =
            select_native_variant(&build_info.portable, platform.os, platform.arch).cloned();
        Self {
            build_info,
            updater,
            portable,
            client,
        }
    }

    pub fn updater(&self) -> Option<&BuildVariant> {
        self.updater.as_ref()
    }

    pub fn portable(&self) -> Option<&BuildVariant> {
        self.portable.as_ref()
    }

    /// The client the manifest was fetched with.
    pub fn client(&self) -> &Arc<dyn HttpClient> {
        &self.client
    }

    /// Both native variants, `(updater, portable)`. Missing either is a
    /// configuration problem on the publishing side and will not fix itself.
    pub fn native_variants(&self) -> Result<(&BuildVariant, &BuildVariant)> {
        match (&self.updater, &self.portable) {
            (Some(u), Some(p)) => Ok((u, p)),
            (None, _) => Err(UpdateError::Configuration(format!(
                "no native updater variant for v{}",
                self.build_info.version
            ))),
            (_, None) => Err(UpdateError::Configuration(format!(
                "no native portable variant for v{}",
                self.build_info.version
            ))),
        }
    }

    pub fn can_self_update(&self, platform: &dyn PlatformAdapter) -> bool {
        if platform.is_installed() {
            return platform.can_install_update(&self.build_info);
        }
        match self.native_variants() {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!("portable self-update unavailable: {e}");
                false
            }
        }
    }
}

impl fmt::Debug for AvailableUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AvailableUpdate")
            .field("build_info", &self.build_info)
            .field("updater", &self.updater)
            .field("portable", &self.portable)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Task;
    use crate::types::{Arch, InstallResult, Os, ReleaseChannel};

    struct NoNet;

    impl HttpClient for NoNet {
        fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
            Err(UpdateError::HttpStatus {
                url: url.into(),
                status: 503,
            })
        }
    }

    struct Installed(bool);

    impl PlatformAdapter for Installed {
        fn is_installed(&self) -> bool {
            true
        }

        fn can_install_update(&self, _build: &BuildInfo) -> bool {
            self.0
        }

        fn begin_install_update(&self, _: &BuildInfo, _: Arc<dyn HttpClient>) -> Task<InstallResult> {
            Task::ready(Ok(InstallResult::StartedNoFeedback))
        }
    }

    const WIN64: Platform = Platform {
        os: Os::Windows,
        arch: Arch::X64,
    };

    fn variant(os: Os, arch: Arch, url: &str) -> BuildVariant {
        BuildVariant {
            os,
            arch,
            download_url: url.into(),
        }
    }

    fn build(updater: Vec<BuildVariant>, portable: Vec<BuildVariant>) -> BuildInfo {
        BuildInfo {
            version: Version::new(2, 0, 0),
            release_channel: ReleaseChannel::Public,
            github_url: String::new(),
            msix_bundle_url: String::new(),
            updater,
            portable,
        }
    }

    #[test]
    fn classify_only_newer_is_available() {
        let local = Version::new(1, 5, 0);
        assert_eq!(classify(&Version::new(2, 0, 0), &local), UpdateStatus::UpdateAvailable);
        assert_eq!(classify(&Version::new(1, 5, 0), &local), UpdateStatus::UpToDate);
        assert_eq!(classify(&Version::new(1, 4, 9), &local), UpdateStatus::UpToDate);
        assert_eq!(
            classify(&Version::with_build(1, 5, 0, 1), &local),
            UpdateStatus::UpdateAvailable
        );
    }

    #[test]
    fn resolves_variants_for_platform() {
        let info = build(
            vec![
                variant(Os::Linux, Arch::X64, "u-linux"),
                variant(Os::Windows, Arch::X64, "u-win"),
            ],
            vec![variant(Os::Windows, Arch::X64, "p-win")],
        );
        let update = AvailableUpdate::for_platform(info, Arc::new(NoNet), WIN64);

        let (u, p) = update.native_variants().unwrap();
        assert_eq!(u.download_url, "u-win");
        assert_eq!(p.download_url, "p-win");
        assert!(update.can_self_update(&crate::platform::PortablePlatform));
    }

    #[test]
    fn missing_variant_is_configuration_error() {
        let info = build(vec![variant(Os::Windows, Arch::X64, "u-win")], vec![]);
        let update = AvailableUpdate::for_platform(info, Arc::new(NoNet), WIN64);

        let err = update.native_variants().unwrap_err();
        assert_eq!(err.category(), "configuration");
        assert!(!err.is_transient());
        assert!(update.portable().is_none());
        assert!(!update.can_self_update(&crate::platform::PortablePlatform));
    }

    #[test]
    fn installed_mode_defers_to_platform() {
        let update = AvailableUpdate::for_platform(build(vec![], vec![]), Arc::new(NoNet), WIN64);
        assert!(update.can_self_update(&Installed(true)));
        assert!(!update.can_self_update(&Installed(false)));
    }

    #[test]
    fn keeps_the_fetching_client() {
        let client: Arc<dyn HttpClient> = Arc::new(NoNet);
        let update = AvailableUpdate::for_platform(build(vec![], vec![]), client.clone(), WIN64);
        assert!(Arc::ptr_eq(update.client(), &client));
    }
}
