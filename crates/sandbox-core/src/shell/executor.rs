//! Deadline-bounded `sh -c` execution inside the workspace.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use tokio::process::{Child, Command};
use tracing::{debug, warn, Instrument};

use super::capture::{combine_output, Capture};
use super::error::{ExecError, ExecResult, FailureReason};
use crate::obs;
use crate::store::SessionId;
use crate::workspace::Workspace;

/// How long to keep draining pipes after the shell is gone.
const DRAIN_GRACE: Duration = Duration::from_secs(1);

/// Default interpreter for command strings.
pub const DEFAULT_SHELL: &str = "sh";

/// Runs caller-supplied shell strings with a hard deadline.
///
/// Each call is independent: Running → Completed | TimedOut | NonZeroExit,
/// with no retries. The child runs in its own process group, and that group
/// is killed once the shell is gone however it ended, so nothing it started
/// outlives the call.
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    workdir: PathBuf,
    timeout: Duration,
    shell: String,
}

impl ShellExecutor {
    pub fn new(workspace: &Workspace, timeout: Duration) -> Self {
        Self {
            workdir: workspace.root().to_path_buf(),
            timeout,
            shell: DEFAULT_SHELL.to_string(),
        }
    }

    /// Use a different interpreter. It is invoked as `<shell> -c <command>`.
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Run `command` and return combined stdout/stderr.
    ///
    /// On non-zero exit or timeout the error still carries any output that
    /// was captured. An empty command is passed to the shell as-is.
    pub async fn execute(&self, session_id: &SessionId, command: &str) -> ExecResult<String> {
        self.execute_inner(command)
            .instrument(obs::session_span(session_id, "shell.execute"))
            .await
    }

    async fn execute_inner(&self, command: &str) -> ExecResult<String> {
        let start = Instant::now();
        debug!(command = %command, timeout_secs = self.timeout.as_secs(), "executing shell command");

        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c")
            .arg(command)
            .current_dir(&self.workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(ExecError::Spawn)?;
        // Read before waiting: a reaped child no longer reports its pid.
        let pgid = child.id();
        let stdout = Capture::spawn(child.stdout.take());
        let stderr = Capture::spawn(child.stderr.take());

        let status = match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(Ok(status)) => Some(status),
            Ok(Err(e)) => {
                terminate(&mut child, pgid).await;
                return Err(ExecError::Wait(e));
            }
            Err(_elapsed) => {
                warn!(command = %command, timeout_secs = self.timeout.as_secs(), "shell command timed out");
                terminate(&mut child, pgid).await;
                None
            }
        };
        // Background jobs may still hold the pipes open.
        kill_group(pgid);

        let (stdout, stderr) = tokio::join!(
            stdout.finish(DRAIN_GRACE),
            stderr.finish(DRAIN_GRACE)
        );
        let output = combine_output(&stdout, &stderr);

        let duration_ms = start.elapsed().as_millis() as u64;
        obs::emit_shell_finished(
            status.and_then(|s| s.code()),
            duration_ms,
            output.len(),
            status.is_none(),
        );

        match status {
            Some(status) if status.success() => Ok(output),
            Some(status) => Err(ExecError::Failed {
                reason: failure_reason(status),
                output,
            }),
            None => Err(ExecError::Failed {
                reason: FailureReason::TimedOut {
                    limit: self.timeout,
                },
                output,
            }),
        }
    }
}

fn failure_reason(status: ExitStatus) -> FailureReason {
    match status.code() {
        Some(code) => FailureReason::NonZeroExit { code },
        None => FailureReason::Signaled {
            signal: exit_signal(status),
        },
    }
}

#[cfg(unix)]
fn exit_signal(status: ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: ExitStatus) -> Option<i32> {
    None
}

/// SIGKILL every process left in the group led by `pgid`.
fn kill_group(pgid: Option<u32>) {
    #[cfg(unix)]
    if let Some(pid) = pgid {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        // ESRCH here just means the group is already empty.
        if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
            debug!(pgid = pid, error = %e, "killpg found nothing to kill");
        }
    }
    #[cfg(not(unix))]
    let _ = pgid;
}

/// Kill the child's whole process group, then reap the child.
async fn terminate(child: &mut Child, pgid: Option<u32>) {
    kill_group(pgid);
    if let Err(e) = child.kill().await {
        debug!(error = %e, "child already exited");
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn executor(timeout: Duration) -> (tempfile::TempDir, ShellExecutor) {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::open(dir.path()).unwrap();
        (dir, ShellExecutor::new(&ws, timeout))
    }

    fn sid() -> SessionId {
        SessionId::new("sandbox-test")
    }

    #[tokio::test]
    async fn echo_succeeds() {
        let (_dir, exec) = executor(Duration::from_secs(30));
        let out = exec.execute(&sid(), "echo 'Hello, World!'").await.unwrap();
        assert!(out.contains("Hello, World!"));
    }

    #[tokio::test]
    async fn runs_in_workspace() {
        let (_dir, exec) = executor(Duration::from_secs(30));
        let out = exec.execute(&sid(), "pwd -P").await.unwrap();
        assert_eq!(Path::new(out.trim()), exec.workdir());
    }

    #[tokio::test]
    async fn exit_one_fails_without_output() {
        let (_dir, exec) = executor(Duration::from_secs(30));
        let err = exec.execute(&sid(), "exit 1").await.unwrap_err();
        assert!(matches!(
            err,
            ExecError::Failed {
                reason: FailureReason::NonZeroExit { code: 1 },
                ..
            }
        ));
        assert_eq!(err.partial_output(), None);
    }

    #[tokio::test]
    async fn failure_keeps_partial_output() {
        let (_dir, exec) = executor(Duration::from_secs(30));
        let err = exec
            .execute(&sid(), "echo before; echo oops >&2; exit 3")
            .await
            .unwrap_err();
        assert_eq!(err.partial_output(), Some("before\n\noops\n"));
    }

    #[tokio::test]
    async fn stderr_only_has_no_separator() {
        let (_dir, exec) = executor(Duration::from_secs(30));
        let out = exec.execute(&sid(), "echo warn >&2").await.unwrap();
        assert_eq!(out, "warn\n");
    }

    #[tokio::test]
    async fn empty_command_is_shells_call() {
        let (_dir, exec) = executor(Duration::from_secs(30));
        assert_eq!(exec.execute(&sid(), "").await.unwrap(), "");
    }

    #[tokio::test]
    async fn timeout_kills_and_returns_promptly() {
        let (_dir, exec) = executor(Duration::from_secs(1));
        let start = Instant::now();
        let err = exec.execute(&sid(), "sleep 5").await.unwrap_err();
        assert!(err.is_timeout());
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn timeout_kills_background_children_and_keeps_output() {
        let (_dir, exec) = executor(Duration::from_millis(500));
        let start = Instant::now();
        let err = exec
            .execute(&sid(), "echo started; sleep 10 & sleep 10; wait")
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(err.partial_output(), Some("started\n"));
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn missing_shell_is_spawn_error() {
        let (_dir, exec) = executor(Duration::from_secs(1));
        let exec = exec.with_shell("/definitely/not/a/shell");
        let err = exec.execute(&sid(), "true").await.unwrap_err();
        assert!(matches!(err, ExecError::Spawn(_)));
    }

    #[tokio::test]
    async fn success_reaps_background_jobs() {
        let (dir, exec) = executor(Duration::from_secs(30));
        let start = Instant::now();
        let out = exec
            .execute(&sid(), "sleep 30 & echo $! > bg.pid; echo hi")
            .await
            .unwrap();
        assert_eq!(out, "hi\n");
        // Returned without waiting out the drain grace on the inherited pipe.
        assert!(start.elapsed() < DRAIN_GRACE);

        #[cfg(target_os = "linux")]
        {
            let pid = std::fs::read_to_string(dir.path().join("bg.pid")).unwrap();
            let stat = format!("/proc/{}/stat", pid.trim());
            let deadline = Instant::now() + Duration::from_secs(2);
            loop {
                // Gone, or a zombie waiting for its new parent to reap it.
                let alive = match std::fs::read_to_string(&stat) {
                    Ok(line) => {
                        let state = line.rsplit(')').next().unwrap_or("").trim_start();
                        !state.starts_with('Z')
                    }
                    Err(_) => false,
                };
                if !alive {
                    break;
                }
                assert!(Instant::now() < deadline, "background job outlived the call");
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        }
        #[cfg(not(target_os = "linux"))]
        let _ = dir;
    }

    #[tokio::test]
    async fn non_zero_exit_reaps_background_jobs() {
        let (_dir, exec) = executor(Duration::from_secs(30));
        let start = Instant::now();
        let err = exec
            .execute(&sid(), "sleep 30 & echo left; exit 4")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ExecError::Failed {
                reason: FailureReason::NonZeroExit { code: 4 },
                ..
            }
        ));
        assert_eq!(err.partial_output(), Some("left\n"));
        assert!(start.elapsed() < DRAIN_GRACE);
    }
}
