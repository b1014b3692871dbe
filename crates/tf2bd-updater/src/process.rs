//! Launching the update tool and handing over to it.

use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::Arc;

use crate::errors::{Result, UpdateError};
use crate::task::Task;
use crate::types::UpdateToolResult;

/// Process-level capabilities the executor needs.
pub trait ProcessControl: Send + Sync {
    /// Start `path` detached with a shell-style argument string.
    fn launch(&self, path: &Path, args: &str) -> Result<()>;

    fn current_pid(&self) -> u32;

    /// End this process so the update tool can overwrite its files.
    ///
    /// This is the success path of a portable update, not a crash. The real
    /// implementation never returns.
    fn terminate_for_replacement(&self);
}

/// Exit code used when handing over to the update tool.
pub const REPLACEMENT_EXIT_CODE: i32 = 1;

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProcess;

impl ProcessControl for SystemProcess {
    fn launch(&self, path: &Path, args: &str) -> Result<()> {
        let argv = shlex::split(args).ok_or_else(|| UpdateError::Launch {
            path: path.to_path_buf(),
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("unbalanced quoting in arguments: {args}"),
            ),
        })?;

        let mut cmd = Command::new(path);
        cmd.args(&argv)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if let Some(dir) = path.parent() {
            cmd.current_dir(dir);
        }

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            const DETACHED_PROCESS: u32 = 0x0000_0008;
            cmd.creation_flags(DETACHED_PROCESS);
        }

        cmd.spawn().map_err(|source| UpdateError::Launch {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(())
    }

    fn current_pid(&self) -> u32 {
        std::process::id()
    }

    fn terminate_for_replacement(&self) {
        std::process::exit(REPLACEMENT_EXIT_CODE);
    }
}

/// Quote a value for inclusion in an update tool argument string.
pub fn quote_arg(value: &str) -> Result<String> {
    shlex::try_quote(value)
        .map(|q| q.into_owned())
        .map_err(|e| UpdateError::Configuration(format!("cannot quote argument {value:?}: {e}")))
}

/// Launch the update tool, telling it to wait for this process, then exit.
///
/// Only returns when the launch failed or when `process` is a test double
/// whose termination is a no-op.
pub fn run_update_tool(
    process: Arc<dyn ProcessControl>,
    path: std::path::PathBuf,
    mut args: String,
) -> Task<UpdateToolResult> {
    // The tool waits on this pid before it touches our files.
    args.push_str(&format!(" --wait-pid {}", process.current_pid()));

    Task::spawn("tf2bd-run-updater", move || {
        tracing::info!("launching updater {}\n\tArgs: {args}", path.display());
        process.launch(&path, &args)?;

        tracing::warn!("exiting now for portable-mode update...");
        process.terminate_for_replacement();
        Ok(UpdateToolResult { success: true })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    #[derive(Default)]
    struct Recorder {
        launches: Mutex<Vec<(PathBuf, String)>>,
        exits: Mutex<u32>,
        fail: bool,
    }

    impl ProcessControl for Recorder {
        fn launch(&self, path: &Path, args: &str) -> Result<()> {
            if self.fail {
                return Err(UpdateError::Launch {
                    path: path.to_path_buf(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
                });
            }
            self.launches
                .lock()
                .unwrap()
                .push((path.to_path_buf(), args.to_string()));
            Ok(())
        }

        fn current_pid(&self) -> u32 {
            4242
        }

        fn terminate_for_replacement(&self) {
            *self.exits.lock().unwrap() += 1;
        }
    }

    fn wait<T>(task: Task<T>) -> Result<T> {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !task.is_ready() {
            assert!(Instant::now() < deadline, "task never finished");
            std::thread::sleep(Duration::from_millis(1));
        }
        task.join()
    }

    #[test]
    fn appends_wait_pid_then_terminates() {
        let rec = Arc::new(Recorder::default());
        let task = run_update_tool(rec.clone(), PathBuf::from("/tmp/updater"), "--update-type Portable".into());

        let result = wait(task).unwrap();

        assert!(result.success);
        let launches = rec.launches.lock().unwrap();
        assert_eq!(launches.len(), 1);
        assert_eq!(launches[0].1, "--update-type Portable --wait-pid 4242");
        assert_eq!(*rec.exits.lock().unwrap(), 1);
    }

    #[test]
    fn launch_failure_does_not_terminate() {
        let rec = Arc::new(Recorder {
            fail: true,
            ..Default::default()
        });
        let err = wait(run_update_tool(rec.clone(), PathBuf::from("/nope"), String::new())).unwrap_err();

        assert_eq!(err.category(), "launch");
        assert_eq!(*rec.exits.lock().unwrap(), 0);
    }

    #[test]
    fn quoted_paths_survive_splitting() {
        let quoted = quote_arg("/tmp/TF2 Bot Detector/Portable Updates/tool_1/extracted").unwrap();
        let args = format!("--source-path {quoted} --dest-path /opt/tf2bd");
        let argv = shlex::split(&args).unwrap();
        assert_eq!(
            argv,
            [
                "--source-path",
                "/tmp/TF2 Bot Detector/Portable Updates/tool_1/extracted",
                "--dest-path",
                "/opt/tf2bd"
            ]
        );
    }

    #[test]
    fn system_launch_of_missing_binary_is_a_launch_error() {
        let err = SystemProcess
            .launch(Path::new("/definitely/not/here/updater"), "--wait-pid 1")
            .unwrap_err();
        assert_eq!(err.category(), "launch");
    }
}
