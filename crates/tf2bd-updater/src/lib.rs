//! tf2bd-updater
//!
//! Self-update orchestration for TF2 Bot Detector.
//! - Fetches the version manifest for the configured release channel.
//! - Picks the build variants for the running OS and architecture.
//! - Installs through the platform installer, or downloads the portable build
//!   and hands over to the update tool, which replaces us after we exit.
//!
//! Everything is driven by [`UpdateManager::tick`]; blocking I/O runs on
//! background threads and is only ever polled.

pub mod available;
pub mod config;
pub mod errors;
pub mod install;
pub mod manager;
pub mod manifest;
pub mod net;
pub mod paths;
pub mod platform;
pub mod process;
pub mod state;
pub mod task;
pub mod types;
pub mod version;

pub use available::AvailableUpdate;
pub use config::UpdaterConfig;
pub use errors::{Result, ResultExt, UpdateError};
pub use manager::{UpdateManager, UpdateManagerBuilder};
pub use net::{HttpClient, ReqwestClient};
pub use platform::{Platform, PlatformAdapter, PortablePlatform};
pub use process::{ProcessControl, SystemProcess};
pub use state::{StatusReader, StatusSnapshot};
pub use task::Task;
pub use types::*;
pub use version::Version;
