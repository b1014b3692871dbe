//! Single-writer state for the update check and the update pipeline.
//!
//! The owning thread mutates a [`StateManager`] from `tick()`. Other threads
//! only see the published [`StatusSnapshot`], through a [`StatusReader`] or a
//! subscription channel.

use std::sync::{Arc, RwLock};

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::available::AvailableUpdate;
use crate::errors::{Result, UpdateError};
use crate::task::Task;
use crate::types::{
    BuildInfo, DownloadedBuild, DownloadedUpdateTool, InstallResult, UpdateStatus,
    UpdateToolResult,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub status: UpdateStatus,
    pub message: String,
}

/// Cheap, cloneable read handle onto the latest status.
///
/// Reads take a shared lock and may briefly wait while `tick()` publishes.
#[derive(Debug, Clone)]
pub struct StatusReader {
    inner: Arc<RwLock<StatusSnapshot>>,
}

impl StatusReader {
    pub fn get(&self) -> StatusSnapshot {
        match self.inner.read() {
            Ok(g) => g.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn status(&self) -> UpdateStatus {
        self.get().status
    }
}

/// Publishes status changes. Observers are only notified when the pair changes.
#[derive(Debug, Default)]
pub struct StatusSource {
    inner: Arc<RwLock<StatusSnapshot>>,
    subscribers: Vec<Sender<StatusSnapshot>>,
}

impl StatusSource {
    pub fn reader(&self) -> StatusReader {
        StatusReader {
            inner: Arc::clone(&self.inner),
        }
    }

    pub fn subscribe(&mut self) -> Receiver<StatusSnapshot> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Returns `true` if the status or message changed.
    pub fn set(&mut self, status: UpdateStatus, message: &str) -> bool {
        let snapshot = {
            let mut g = match self.inner.write() {
                Ok(g) => g,
                Err(poisoned) => poisoned.into_inner(),
            };
            if g.status == status && g.message == message {
                return false;
            }
            g.status = status;
            g.message = message.to_string();
            g.clone()
        };

        tracing::debug!("{status:?}: {message}");
        self.subscribers.retain(|tx| tx.send(snapshot.clone()).is_ok());
        true
    }
}

/// Version-check slot: nothing, one in-flight fetch, or the last result.
#[derive(Default)]
pub enum CheckState {
    #[default]
    Empty,
    Checking(Task<BuildInfo>),
    Available(AvailableUpdate),
}

/// Update pipeline slot. Holds exactly one stage's task or result.
#[derive(Debug, Default)]
pub enum PipelineState {
    #[default]
    Empty,
    Downloading(Task<DownloadedBuild>),
    Downloaded(DownloadedBuild),
    Installing(Task<InstallResult>),
    Installed(InstallResult),
    DownloadingTool(Task<DownloadedUpdateTool>),
    ToolDownloaded(DownloadedUpdateTool),
    RunningTool(Task<UpdateToolResult>),
    ToolFinished(UpdateToolResult),
}

impl PipelineState {
    pub fn is_empty(&self) -> bool {
        matches!(self, PipelineState::Empty)
    }

    /// Whether a background task is still occupying the slot.
    pub fn is_in_flight(&self) -> bool {
        match self {
            PipelineState::Downloading(t) => !t.is_ready(),
            PipelineState::Installing(t) => !t.is_ready(),
            PipelineState::DownloadingTool(t) => !t.is_ready(),
            PipelineState::RunningTool(t) => !t.is_ready(),
            _ => false,
        }
    }
}

/// A stage output type and the pipeline slot variants that carry it.
pub trait StageResult: Sized {
    fn pending(state: &PipelineState) -> Option<&Task<Self>>;

    /// Move the pending task out, or hand the state back untouched.
    fn take_pending(state: PipelineState) -> std::result::Result<Task<Self>, PipelineState>;

    fn completed(self) -> PipelineState;

    fn success_status(&self, default: UpdateStatus) -> UpdateStatus {
        default
    }
}

impl StageResult for DownloadedBuild {
    fn pending(state: &PipelineState) -> Option<&Task<Self>> {
        match state {
            PipelineState::Downloading(t) => Some(t),
            _ => None,
        }
    }

    fn take_pending(state: PipelineState) -> std::result::Result<Task<Self>, PipelineState> {
        match state {
            PipelineState::Downloading(t) => Ok(t),
            other => Err(other),
        }
    }

    fn completed(self) -> PipelineState {
        PipelineState::Downloaded(self)
    }
}

impl StageResult for InstallResult {
    fn pending(state: &PipelineState) -> Option<&Task<Self>> {
        match state {
            PipelineState::Installing(t) => Some(t),
            _ => None,
        }
    }

    fn take_pending(state: PipelineState) -> std::result::Result<Task<Self>, PipelineState> {
        match state {
            PipelineState::Installing(t) => Ok(t),
            other => Err(other),
        }
    }

    fn completed(self) -> PipelineState {
        PipelineState::Installed(self)
    }

    fn success_status(&self, default: UpdateStatus) -> UpdateStatus {
        match self {
            InstallResult::Success => default,
            InstallResult::StartedNoFeedback => UpdateStatus::Updating,
            InstallResult::NeedsUpdateTool { .. } => UpdateStatus::UpdateToolRequired,
        }
    }
}

impl StageResult for DownloadedUpdateTool {
    fn pending(state: &PipelineState) -> Option<&Task<Self>> {
        match state {
            PipelineState::DownloadingTool(t) => Some(t),
            _ => None,
        }
    }

    fn take_pending(state: PipelineState) -> std::result::Result<Task<Self>, PipelineState> {
        match state {
            PipelineState::DownloadingTool(t) => Ok(t),
            other => Err(other),
        }
    }

    fn completed(self) -> PipelineState {
        PipelineState::ToolDownloaded(self)
    }
}

impl StageResult for UpdateToolResult {
    fn pending(state: &PipelineState) -> Option<&Task<Self>> {
        match state {
            PipelineState::RunningTool(t) => Some(t),
            _ => None,
        }
    }

    fn take_pending(state: PipelineState) -> std::result::Result<Task<Self>, PipelineState> {
        match state {
            PipelineState::RunningTool(t) => Ok(t),
            other => Err(other),
        }
    }

    fn completed(self) -> PipelineState {
        PipelineState::ToolFinished(self)
    }

    fn success_status(&self, default: UpdateStatus) -> UpdateStatus {
        if self.success {
            default
        } else {
            UpdateStatus::UpdateFailed
        }
    }
}

/// Status text for a stage's success and failure.
#[derive(Debug, Clone, Copy)]
pub struct StageLabels {
    pub success: UpdateStatus,
    pub success_msg: &'static str,
    pub failure: UpdateStatus,
    pub failure_msg: &'static str,
}

pub const DOWNLOAD_LABELS: StageLabels = StageLabels {
    success: UpdateStatus::DownloadSuccess,
    success_msg: "Finished downloading new version.",
    failure: UpdateStatus::DownloadFailed,
    failure_msg: "Failed to download new version.",
};

pub const INSTALL_LABELS: StageLabels = StageLabels {
    success: UpdateStatus::UpdateSuccess,
    success_msg: "Finished running platform update.",
    failure: UpdateStatus::UpdateFailed,
    failure_msg: "Failed to run platform update.",
};

pub const TOOL_DOWNLOAD_LABELS: StageLabels = StageLabels {
    success: UpdateStatus::UpdateToolDownloadSuccess,
    success_msg: "Finished downloading update tool.",
    failure: UpdateStatus::UpdateToolDownloadFailed,
    failure_msg: "Failed to download update tool.",
};

pub const TOOL_RUN_LABELS: StageLabels = StageLabels {
    success: UpdateStatus::UpdateSuccess,
    success_msg: "Update complete.",
    failure: UpdateStatus::UpdateFailed,
    failure_msg: "Update failed.",
};

/// New slot contents plus the status that goes with them.
#[derive(Debug)]
pub struct Transition {
    pub state: PipelineState,
    pub status: UpdateStatus,
    pub message: String,
}

/// `"{msg}:\n\t- {category}\n\t- {error}"`
pub fn failure_message(msg: &str, err: &UpdateError) -> String {
    format!("{msg}:\n\t- {}\n\t- {err}", err.category())
}

/// Map a finished stage onto the next slot state. Pure; does no I/O.
pub fn resolve<T: StageResult>(outcome: Result<T>, labels: &StageLabels) -> Transition {
    match outcome {
        Ok(value) => Transition {
            status: value.success_status(labels.success),
            message: labels.success_msg.to_string(),
            state: value.completed(),
        },
        Err(e) => Transition {
            state: PipelineState::Empty,
            status: labels.failure,
            message: failure_message(labels.failure_msg, &e),
        },
    }
}

#[derive(Default)]
pub struct StateManager {
    check: CheckState,
    pipeline: PipelineState,
    status: StatusSource,
}

impl StateManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&self) -> &CheckState {
        &self.check
    }

    pub fn pipeline(&self) -> &PipelineState {
        &self.pipeline
    }

    pub fn available_update(&self) -> Option<&AvailableUpdate> {
        match &self.check {
            CheckState::Available(update) => Some(update),
            _ => None,
        }
    }

    pub fn reader(&self) -> StatusReader {
        self.status.reader()
    }

    pub fn subscribe(&mut self) -> Receiver<StatusSnapshot> {
        self.status.subscribe()
    }

    pub fn set_status(&mut self, status: UpdateStatus, message: impl AsRef<str>) -> bool {
        self.status.set(status, message.as_ref())
    }

    /// Swap the pipeline slot and publish the matching status.
    pub fn replace(&mut self, state: PipelineState, status: UpdateStatus, message: impl AsRef<str>) {
        self.status.set(status, message.as_ref());
        self.pipeline = state;
    }

    pub fn clear(&mut self, status: UpdateStatus, message: impl AsRef<str>) {
        self.replace(PipelineState::Empty, status, message);
    }

    pub fn replace_check(&mut self, state: CheckState, status: UpdateStatus, message: impl AsRef<str>) {
        self.status.set(status, message.as_ref());
        self.check = state;
    }

    pub fn clear_check(&mut self, status: UpdateStatus, message: impl AsRef<str>) {
        self.replace_check(CheckState::Empty, status, message);
    }

    /// True when starting a new check will not discard unfinished work.
    pub fn can_replace_check_state(&self) -> bool {
        match &self.check {
            CheckState::Checking(task) => task.is_ready(),
            _ => true,
        }
    }

    /// Take the check result if the fetch has finished; leaves the slot empty.
    pub fn take_ready_check(&mut self) -> Option<Result<BuildInfo>> {
        match &self.check {
            CheckState::Checking(task) if task.is_ready() => {}
            _ => return None,
        }
        match std::mem::take(&mut self.check) {
            CheckState::Checking(task) => Some(task.join()),
            other => {
                self.check = other;
                None
            }
        }
    }

    /// Resolve the pipeline's `T` task if it has finished.
    ///
    /// Returns `true` if the slot held a `T` task, ready or not. A slot holding
    /// anything else is left alone.
    pub fn poll_stage<T: StageResult>(&mut self, labels: &StageLabels) -> bool {
        match T::pending(&self.pipeline) {
            None => return false,
            Some(task) if !task.is_ready() => return true,
            Some(_) => {}
        }

        let task = match T::take_pending(std::mem::take(&mut self.pipeline)) {
            Ok(task) => task,
            Err(state) => {
                self.pipeline = state;
                return false;
            }
        };

        let outcome = task.join();
        if let Err(e) = &outcome {
            tracing::error!(
                category = e.category(),
                transient = e.is_transient(),
                "{} {e}",
                labels.failure_msg
            );
        }

        let Transition {
            state,
            status,
            message,
        } = resolve(outcome, labels);
        self.replace(state, status, message);
        true
    }
}
