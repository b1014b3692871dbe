use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::{
    path::PathBuf,
    process::ExitCode,
    sync::Arc,
    thread,
    time::{Duration, Instant},
};
use tf2bd_updater::{
    manager::PKG_VERSION, ReleaseChannel, ReqwestClient, UpdateManager, UpdateStatus,
    UpdaterConfig, Version,
};
use tracing_subscriber::EnvFilter;

/// Check for TF2 Bot Detector updates and optionally install them.
#[derive(Parser)]
#[command(name = "tf2bd-update", version, about)]
struct Cli {
    /// Path to the updater JSON config.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Release channel: public, preview, nightly or none.
    #[arg(long)]
    channel: Option<ReleaseChannel>,

    /// Manifest URL template; `{channel}` is substituted.
    #[arg(long)]
    manifest_url: Option<String>,

    /// Version to compare against instead of this binary's.
    #[arg(long)]
    local_version: Option<Version>,

    /// Install the update once one is found.
    #[arg(long)]
    apply: bool,

    /// Print the fetched build info as JSON when an update is available.
    #[arg(long)]
    json: bool,

    #[arg(long, default_value_t = 100)]
    interval_ms: u64,

    /// Give up after this many seconds.
    #[arg(long, default_value_t = 600)]
    timeout_secs: u64,
}

const EXIT_FAILURE: u8 = 1;
const EXIT_UPDATE_AVAILABLE: u8 = 2;

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut cfg = UpdaterConfig::load_or_default(cli.config.as_deref())
        .context("loading updater config")?;
    if let Some(channel) = cli.channel {
        cfg.release_channel = channel;
    }
    if let Some(url) = cli.manifest_url.clone() {
        cfg.manifest_url = url;
    }
    // A one-shot run always checks.
    cfg.check_on_startup = true;

    let local_version = match cli.local_version {
        Some(v) => v,
        None => PKG_VERSION.parse().context("parsing package version")?,
    };

    let mut builder = UpdateManager::builder(cfg.clone()).local_version(local_version);
    if cfg.allow_internet {
        let client = ReqwestClient::with_timeout(Duration::from_secs(cli.timeout_secs))
            .context("building HTTP client")?;
        builder = builder.http_client(Arc::new(client));
    }
    let mut manager = builder.build();

    run(&cli, &mut manager)
}

fn run(cli: &Cli, manager: &mut UpdateManager) -> Result<ExitCode> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(120));

    let deadline = Instant::now() + Duration::from_secs(cli.timeout_secs);
    let interval = Duration::from_millis(cli.interval_ms.max(1));
    let updates = manager.subscribe();
    let mut applying = false;

    loop {
        manager.tick();

        for snap in updates.try_iter() {
            pb.println(format!("[{:?}] {}", snap.status, snap.message));
        }

        let snap = manager.get_status();
        pb.set_message(snap.message.lines().next().unwrap_or_default().to_string());

        match snap.status {
            UpdateStatus::UpToDate => {
                pb.finish_and_clear();
                return Ok(ExitCode::SUCCESS);
            }
            UpdateStatus::UpdateAvailable if !applying => {
                if cli.json {
                    if let Some(update) = manager.get_available_update() {
                        pb.println(serde_json::to_string_pretty(&update.build_info)?);
                    }
                }
                if !cli.apply {
                    pb.finish_and_clear();
                    return Ok(ExitCode::from(EXIT_UPDATE_AVAILABLE));
                }
                if !manager.begin_self_update() {
                    pb.finish_and_clear();
                    eprintln!("update available, but this build cannot update itself");
                    return Ok(ExitCode::from(EXIT_FAILURE));
                }
                applying = true;
            }
            UpdateStatus::UpdateSuccess => {
                pb.finish_and_clear();
                return Ok(ExitCode::SUCCESS);
            }
            UpdateStatus::UpdateCheckDisabled | UpdateStatus::InternetAccessDisabled => {
                pb.finish_and_clear();
                eprintln!("{}", snap.message);
                return Ok(ExitCode::from(EXIT_FAILURE));
            }
            status if status.is_failure() => {
                pb.finish_and_clear();
                eprintln!("{}", snap.message);
                return Ok(ExitCode::from(EXIT_FAILURE));
            }
            _ => {}
        }

        if Instant::now() >= deadline {
            pb.finish_and_clear();
            eprintln!("timed out after {}s ({:?})", cli.timeout_secs, snap.status);
            return Ok(ExitCode::from(EXIT_FAILURE));
        }
        thread::sleep(interval);
    }
}
