//! Poll-driven self-update orchestration.
//!
//! [`UpdateManager::tick`] is the only place state moves forward. Call it
//! periodically from one thread; background work happens on task threads and
//! is picked up on the next tick after it finishes.

use std::path::PathBuf;
use std::sync::Arc;

use crossbeam_channel::Receiver;

use crate::available::{classify, AvailableUpdate};
use crate::config::UpdaterConfig;
use crate::errors::UpdateError;
use crate::install::{download_build, download_update_tool};
use crate::manifest::fetch_build_info;
use crate::net::HttpClient;
use crate::platform::{PlatformAdapter, PortablePlatform};
use crate::process::{quote_arg, run_update_tool, ProcessControl, SystemProcess};
use crate::state::{
    failure_message, CheckState, PipelineState, StateManager, StatusReader, StatusSnapshot,
    DOWNLOAD_LABELS, INSTALL_LABELS, TOOL_DOWNLOAD_LABELS, TOOL_RUN_LABELS,
};
use crate::task::Task;
use crate::types::{
    BuildInfo, BuildVariant, DownloadedBuild, DownloadedUpdateTool, InstallResult, ReleaseChannel,
    UpdateStatus, UpdateToolResult,
};
use crate::version::Version;

/// Version of this crate, used when the host does not supply its own.
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

pub struct UpdateManagerBuilder {
    config: UpdaterConfig,
    client: Option<Arc<dyn HttpClient>>,
    platform: Arc<dyn PlatformAdapter>,
    process: Arc<dyn ProcessControl>,
    local_version: Option<Version>,
}

impl UpdateManagerBuilder {
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn platform(mut self, platform: Arc<dyn PlatformAdapter>) -> Self {
        self.platform = platform;
        self
    }

    pub fn process(mut self, process: Arc<dyn ProcessControl>) -> Self {
        self.process = process;
        self
    }

    pub fn local_version(mut self, version: Version) -> Self {
        self.local_version = Some(version);
        self
    }

    pub fn build(self) -> UpdateManager {
        let local_version = self
            .local_version
            .or_else(|| Version::parse(PKG_VERSION).ok())
            .unwrap_or(Version::new(0, 0, 0));

        let mut state = StateManager::new();
        let update_queued = self.config.check_on_startup;
        if update_queued {
            state.set_status(UpdateStatus::CheckQueued, "Update check queued...");
        }

        UpdateManager {
            config: self.config,
            local_version,
            client: self.client,
            platform: self.platform,
            process: self.process,
            state,
            update_queued,
            queue_blocked: None,
        }
    }
}

/// Where the pipeline goes next once a stage result is sitting in the slot.
enum Advance {
    ToolForBuild(DownloadedBuild),
    ToolForInstaller(String),
    RunTool(DownloadedUpdateTool),
}

/// What `begin_self_update` decided, computed before touching the pipeline.
enum SelfUpdatePlan {
    Installer(BuildInfo),
    Portable {
        portable: BuildVariant,
        updater: BuildVariant,
    },
}

pub struct UpdateManager {
    config: UpdaterConfig,
    local_version: Version,
    client: Option<Arc<dyn HttpClient>>,
    platform: Arc<dyn PlatformAdapter>,
    process: Arc<dyn ProcessControl>,
    state: StateManager,
    update_queued: bool,
    /// Why the queued check cannot start, once published for this request.
    queue_blocked: Option<UpdateStatus>,
}

impl UpdateManager {
    pub fn builder(config: UpdaterConfig) -> UpdateManagerBuilder {
        UpdateManagerBuilder {
            config,
            client: None,
            platform: Arc::new(PortablePlatform),
            process: Arc::new(SystemProcess),
            local_version: None,
        }
    }

    pub fn config(&self) -> &UpdaterConfig {
        &self.config
    }

    pub fn local_version(&self) -> &Version {
        &self.local_version
    }

    /// Swap the transport, e.g. when the user toggles internet access.
    /// Work already in flight keeps the client it started with.
    pub fn set_http_client(&mut self, client: Option<Arc<dyn HttpClient>>) {
        self.client = client;
    }

    pub fn set_release_channel(&mut self, channel: ReleaseChannel) {
        self.config.release_channel = channel;
    }

    pub fn get_status(&self) -> StatusSnapshot {
        self.state.reader().get()
    }

    pub fn status_reader(&self) -> StatusReader {
        self.state.reader()
    }

    pub fn subscribe(&mut self) -> Receiver<StatusSnapshot> {
        self.state.subscribe()
    }

    pub fn pipeline(&self) -> &PipelineState {
        self.state.pipeline()
    }

    pub fn get_available_update(&self) -> Option<&AvailableUpdate> {
        self.state.available_update()
    }

    pub fn is_update_queued(&self) -> bool {
        self.update_queued
    }

    pub fn queue_update_check(&mut self) {
        if self.update_queued {
            return;
        }
        self.update_queued = true;
        self.queue_blocked = None;
        self.state
            .set_status(UpdateStatus::CheckQueued, "Update check queued...");
    }

    pub fn can_replace_check_state(&self) -> bool {
        self.state.can_replace_check_state()
    }

    pub fn can_self_update(&self) -> bool {
        self.get_available_update()
            .map_or(false, |u| u.can_self_update(self.platform.as_ref()))
    }

    /// One step of the state machine. Never blocks on network or disk.
    pub fn tick(&mut self) {
        self.start_queued_check();
        self.poll_check();
        self.advance_pipeline();

        self.state.poll_stage::<DownloadedBuild>(&DOWNLOAD_LABELS);
        self.state.poll_stage::<InstallResult>(&INSTALL_LABELS);
        self.state.poll_stage::<DownloadedUpdateTool>(&TOOL_DOWNLOAD_LABELS);
        self.state.poll_stage::<UpdateToolResult>(&TOOL_RUN_LABELS);
    }

    /// Start installing the available update. Returns `false` (and leaves the
    /// pipeline alone) when that is not possible.
    pub fn begin_self_update(&mut self) -> bool {
        let plan = {
            let Some(update) = self.get_available_update() else {
                tracing::error!("begin_self_update called with no available update");
                return false;
            };
            if !update.can_self_update(self.platform.as_ref()) {
                tracing::error!("begin_self_update called when can_self_update() is false");
                return false;
            }

            if self.platform.is_installed() {
                SelfUpdatePlan::Installer(update.build_info.clone())
            } else {
                match update.native_variants() {
                    Ok((updater, portable)) => SelfUpdatePlan::Portable {
                        portable: portable.clone(),
                        updater: updater.clone(),
                    },
                    Err(e) => {
                        tracing::error!(category = e.category(), "cannot self-update: {e}");
                        return false;
                    }
                }
            }
        };

        let Some(client) = self.client.clone() else {
            tracing::error!("begin_self_update called without an HTTP client");
            return false;
        };

        match plan {
            SelfUpdatePlan::Installer(build) => {
                let task = self.platform.begin_install_update(&build, client);
                self.state.replace(
                    PipelineState::Installing(task),
                    UpdateStatus::Updating,
                    "Platform reports that TF2 Bot Detector is installed and can be updated. Running platform updater...",
                );
            }
            SelfUpdatePlan::Portable { portable, updater } => {
                let task = download_build(client, &self.config.download_root(), portable, updater);
                self.state.replace(
                    PipelineState::Downloading(task),
                    UpdateStatus::Downloading,
                    "Platform reports that TF2 Bot Detector is not installed. Updating in-place (portable mode)",
                );
            }
        }
        true
    }

    fn start_queued_check(&mut self) {
        if !self.update_queued || !self.state.can_replace_check_state() {
            return;
        }

        let channel = self.config.release_channel;
        if !channel.is_enabled() {
            return self.report_queue_blocked(
                UpdateStatus::UpdateCheckDisabled,
                "Update checks are disabled (release channel is None)",
            );
        }
        let Some(client) = self.client.clone() else {
            return self.report_queue_blocked(
                UpdateStatus::InternetAccessDisabled,
                "Update check skipped: internet access is disabled",
            );
        };
        self.queue_blocked = None;

        let url = self.config.manifest_url_for(channel);
        tracing::info!("checking for updates on {channel} channel: {url}");
        let task = Task::spawn("tf2bd-update-check", move || {
            fetch_build_info(client.as_ref(), &url)
        });

        self.state.replace_check(
            CheckState::Checking(task),
            UpdateStatus::Checking,
            "Checking for updates...",
        );
        self.update_queued = false;
    }

    /// Published once per reason, so later pipeline statuses are not overwritten.
    fn report_queue_blocked(&mut self, status: UpdateStatus, message: &str) {
        if self.queue_blocked == Some(status) {
            return;
        }
        self.queue_blocked = Some(status);
        self.state.set_status(status, message);
    }

    fn poll_check(&mut self) {
        let Some(outcome) = self.state.take_ready_check() else {
            return;
        };

        let build = match outcome {
            Ok(build) => build,
            Err(e) => {
                tracing::error!(
                    category = e.category(),
                    transient = e.is_transient(),
                    "update check failed: {e}"
                );
                self.state.clear_check(
                    UpdateStatus::CheckFailed,
                    failure_message("Update check failed", &e),
                );
                return;
            }
        };

        let Some(client) = self.client.clone() else {
            self.state.clear_check(
                UpdateStatus::CheckFailed,
                "Update check failed: internet access was disabled during the check",
            );
            return;
        };

        let channel = self.config.release_channel;
        let status = classify(&build.version, &self.local_version);
        let message = match status {
            UpdateStatus::UpdateAvailable => {
                format!("Update available (v{} {channel})", build.version)
            }
            _ => format!("Up to date (v{} {channel})", self.local_version),
        };
        tracing::info!("{message}");

        let update = AvailableUpdate::new(build, client);
        self.state
            .replace_check(CheckState::Available(update), status, message);
    }

    fn advance_pipeline(&mut self) {
        let next = match self.state.pipeline() {
            PipelineState::Downloaded(build) => Advance::ToolForBuild(build.clone()),
            PipelineState::Installed(InstallResult::NeedsUpdateTool { args }) => {
                Advance::ToolForInstaller(args.clone())
            }
            PipelineState::ToolDownloaded(tool) => Advance::RunTool(tool.clone()),
            _ => return,
        };

        match next {
            Advance::ToolForBuild(build) => self.download_tool_for_build(build),
            Advance::ToolForInstaller(args) => self.download_tool_for_installer(args),
            Advance::RunTool(tool) => {
                let task = run_update_tool(Arc::clone(&self.process), tool.path, tool.arguments);
                self.state.replace(
                    PipelineState::RunningTool(task),
                    UpdateStatus::Updating,
                    "Running update tool...",
                );
            }
        }
    }

    fn download_tool_for_build(&mut self, build: DownloadedBuild) {
        const FAILED: &str = "Unable to begin downloading update tool";

        let args = match self.portable_tool_args(&build.extracted_location) {
            Ok(args) => args,
            Err(e) => return self.fail_tool_acquisition(FAILED, e),
        };
        let Some(client) = self.client.clone() else {
            return self.fail_tool_acquisition(FAILED, no_client());
        };

        let task = download_update_tool(
            client,
            &self.config.download_root(),
            build.updater_variant,
            args,
        );
        self.state.replace(
            PipelineState::DownloadingTool(task),
            UpdateStatus::UpdateToolDownloading,
            "New version downloaded. Downloading update tool...",
        );
    }

    fn download_tool_for_installer(&mut self, args: String) {
        const FAILED: &str = "Platform app updater unavailable, and unable to download update tool";

        let updater = match self.get_available_update() {
            Some(update) => update.native_variants().map(|(u, _)| u.clone()),
            None => Err(UpdateError::Configuration(
                "no available update to take the update tool from".into(),
            )),
        };
        let updater = match updater {
            Ok(u) => u,
            Err(e) => return self.fail_tool_acquisition(FAILED, e),
        };
        let Some(client) = self.client.clone() else {
            return self.fail_tool_acquisition(FAILED, no_client());
        };

        let task = download_update_tool(client, &self.config.download_root(), updater, args);
        self.state.replace(
            PipelineState::DownloadingTool(task),
            UpdateStatus::UpdateToolDownloading,
            "Platform app updater unavailable. Downloading update tool...",
        );
    }

    fn fail_tool_acquisition(&mut self, msg: &str, e: UpdateError) {
        tracing::error!(
            category = e.category(),
            transient = e.is_transient(),
            "{msg}: {e}"
        );
        self.state
            .clear(UpdateStatus::UpdateToolDownloadFailed, failure_message(msg, &e));
    }

    fn portable_tool_args(&self, source: &std::path::Path) -> Result<String, UpdateError> {
        let dest: PathBuf = self.config.install_dir()?;
        Ok(format!(
            "--update-type Portable --source-path {} --dest-path {}",
            quote_arg(&source.to_string_lossy())?,
            quote_arg(&dest.to_string_lossy())?,
        ))
    }
}

fn no_client() -> UpdateError {
    UpdateError::Configuration("internet access is disabled".into())
}
