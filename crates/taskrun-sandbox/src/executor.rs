// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use taskrun_config::SandboxConfig;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{base_executable, jail_args, LimitedBuffer, SandboxError};

/// How long readers may keep draining pipes after the process is gone.
/// Background grandchildren can hold a pipe open indefinitely.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecMode {
    /// Allowlisted executable, run directly.
    Allowlisted,
    /// Inside the bubblewrap jail.
    Jailed,
    /// No jail available or sandboxing disabled.
    Direct,
}

#[derive(Debug, Clone)]
pub struct ExecResult {
    pub stdout: String,
    pub stderr: String,
    /// Process exit code; `128 + signal` when killed by a signal.
    pub exit_code: i32,
    pub truncated: bool,
    pub timed_out: bool,
    pub duration: Duration,
    pub mode: ExecMode,
}

impl ExecResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0 && !self.timed_out
    }
}

/// Runs shell commands for one task under a fixed policy.
#[derive(Debug, Clone)]
pub struct Sandbox {
    policy: SandboxConfig,
    bwrap: Option<PathBuf>,
}

impl Sandbox {
    /// Probe for bubblewrap when the policy enables sandboxing on Linux.
    pub fn new(policy: SandboxConfig) -> Self {
        let bwrap = if policy.enabled && cfg!(target_os = "linux") {
            which::which("bwrap").ok()
        } else {
            None
        };
        match &bwrap {
            Some(p) => debug!(bwrap = %p.display(), "sandbox jail available"),
            None if policy.enabled => warn!("bubblewrap not found; commands will run unsandboxed"),
            None => debug!("sandboxing disabled by configuration"),
        }
        Self { policy, bwrap }
    }

    /// Never jails, regardless of the host.
    pub fn unsandboxed(policy: SandboxConfig) -> Self {
        Self { policy, bwrap: None }
    }

    pub fn policy(&self) -> &SandboxConfig {
        &self.policy
    }

    pub fn mode_for(&self, cmd: &str, use_allowlist: bool) -> ExecMode {
        if use_allowlist && base_executable(cmd).is_some_and(|exe| self.policy.is_command_allowed(exe)) {
            ExecMode::Allowlisted
        } else if self.bwrap.is_some() {
            ExecMode::Jailed
        } else {
            ExecMode::Direct
        }
    }

    /// Run `cmd` in `workdir` honouring the allowlist.
    pub async fn run(&self, cmd: &str, workdir: &Path) -> Result<ExecResult, SandboxError> {
        self.run_with(cmd, workdir, true).await
    }

    /// Run `cmd` in `workdir`.  A timeout yields
    /// [`SandboxError::TimedOut`] carrying the partial result.
    pub async fn run_with(&self, cmd: &str, workdir: &Path, use_allowlist: bool) -> Result<ExecResult, SandboxError> {
        let mode = self.mode_for(cmd, use_allowlist);
        let mut command = match (mode, &self.bwrap) {
            (ExecMode::Jailed, Some(bwrap)) => {
                let mut c = Command::new(bwrap);
                c.args(jail_args(workdir, cmd));
                c
            }
            _ => {
                let mut c = Command::new("sh");
                c.arg("-c").arg(cmd).current_dir(workdir);
                c
            }
        };
        match mode {
            ExecMode::Jailed => debug!(cmd, "running in jail"),
            ExecMode::Allowlisted => info!(cmd, "running allowlisted command outside the jail"),
            ExecMode::Direct => info!(cmd, "running unsandboxed"),
        }

        command.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped()).kill_on_drop(true);
        // New session so the whole process tree can be killed on timeout.
        #[cfg(unix)]
        unsafe {
            command.pre_exec(|| {
                libc::setsid();
                Ok(())
            });
        }

        let started = Instant::now();
        let program = if mode == ExecMode::Jailed { "bwrap" } else { "sh" };
        let mut child = command.spawn().map_err(|source| SandboxError::Spawn { program: program.into(), source })?;
        // The pid doubles as the session's group id; `id()` is gone once reaped.
        let pgid = child.id();

        let limit = self.policy.output_limit_bytes;
        let stdout_buf = Arc::new(Mutex::new(LimitedBuffer::new(limit)));
        let stderr_buf = Arc::new(Mutex::new(LimitedBuffer::new(limit)));
        let readers = [
            child.stdout.take().map(|s| spawn_reader(s, stdout_buf.clone())),
            child.stderr.take().map(|s| spawn_reader(s, stderr_buf.clone())),
        ];

        let timeout = self.policy.timeout();
        let status = match tokio::time::timeout(timeout, child.wait()).await {
            Ok(status) => Some(status?),
            Err(_) => {
                warn!(cmd, timeout_secs = timeout.as_secs(), "command timed out; killing process group");
                kill_tree(&mut child, pgid).await;
                None
            }
        };

        for reader in readers.into_iter().flatten() {
            drain(reader).await;
        }
        // A lingering grandchild may outlive the shell; take it down too.
        if status.is_some() {
            kill_group(pgid);
        }

        let (stdout, out_trunc) = snapshot(&stdout_buf);
        let (stderr, err_trunc) = snapshot(&stderr_buf);
        let result = ExecResult {
            stdout,
            stderr,
            exit_code: status.map(exit_code).unwrap_or(-1),
            truncated: out_trunc || err_trunc,
            timed_out: status.is_none(),
            duration: started.elapsed(),
            mode,
        };
        debug!(
            exit_code = result.exit_code,
            truncated = result.truncated,
            elapsed_ms = result.duration.as_millis() as u64,
            "command finished"
        );

        if result.timed_out {
            return Err(SandboxError::TimedOut { timeout, result: Box::new(result) });
        }
        Ok(result)
    }
}

fn spawn_reader<R>(mut stream: R, sink: Arc<Mutex<LimitedBuffer>>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut chunk = [0u8; 8192];
        loop {
            match stream.read(&mut chunk).await {
                Ok(0) => break,
                Ok(n) => {
                    if let Ok(mut buf) = sink.lock() {
                        buf.write(&chunk[..n]);
                    }
                }
                Err(e) => {
                    debug!(error = %e, "output pipe read failed");
                    break;
                }
            }
        }
    })
}

async fn drain(reader: JoinHandle<()>) {
    let abort = reader.abort_handle();
    if tokio::time::timeout(DRAIN_GRACE, reader).await.is_err() {
        debug!("output pipe still open after exit; abandoning reader");
        abort.abort();
    }
}

fn snapshot(buf: &Arc<Mutex<LimitedBuffer>>) -> (String, bool) {
    match buf.lock() {
        Ok(b) => (b.to_string_lossy(), b.truncated()),
        Err(_) => (String::new(), false),
    }
}

fn kill_group(pgid: Option<u32>) {
    #[cfg(unix)]
    if let Some(pid) = pgid {
        // SAFETY: signalling a process group we created with setsid.
        unsafe {
            libc::kill(-(pid as libc::pid_t), libc::SIGKILL);
        }
    }
    #[cfg(not(unix))]
    let _ = pgid;
}

/// Kill the whole session and reap the direct child.
async fn kill_tree(child: &mut Child, pgid: Option<u32>) {
    kill_group(pgid);
    if let Err(e) = child.kill().await {
        debug!(error = %e, "kill after timeout failed; child already gone");
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(sig) = status.signal() {
            return 128 + sig;
        }
    }
    -1
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::TRUNCATION_MARKER;

    fn policy() -> SandboxConfig {
        SandboxConfig {
            enabled: false,
            allowlist: vec!["git".into()],
            timeout_secs: 10,
            output_limit_bytes: 1000,
        }
    }

    #[test]
    fn allowlisted_full_path_bypasses_jail() {
        let sb = Sandbox { policy: policy(), bwrap: Some(PathBuf::from("/usr/bin/bwrap")) };
        assert_eq!(sb.mode_for("/usr/bin/git status", true), ExecMode::Allowlisted);
        assert_eq!(sb.mode_for("git status", true), ExecMode::Allowlisted);
        assert_eq!(sb.mode_for("git status", false), ExecMode::Jailed);
        assert_eq!(sb.mode_for("rm -rf x", true), ExecMode::Jailed);
    }

    #[test]
    fn no_jail_means_direct() {
        let sb = Sandbox::unsandboxed(policy());
        assert_eq!(sb.mode_for("ls", true), ExecMode::Direct);
    }

    #[test]
    fn disabled_policy_never_probes() {
        let sb = Sandbox::new(policy());
        assert_eq!(sb.mode_for("ls", true), ExecMode::Direct);
    }

    #[tokio::test]
    async fn captures_stdout_stderr_and_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let sb = Sandbox::unsandboxed(policy());
        let r = sb.run("echo out; echo err 1>&2; exit 3", dir.path()).await.unwrap();
        assert_eq!(r.stdout, "out\n");
        assert_eq!(r.stderr, "err\n");
        assert_eq!(r.exit_code, 3);
        assert!(!r.timed_out);
        assert!(!r.success());
    }

    #[tokio::test]
    async fn runs_in_workdir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "x").unwrap();
        let r = Sandbox::unsandboxed(policy()).run("ls", dir.path()).await.unwrap();
        assert!(r.stdout.contains("marker.txt"));
        assert!(r.success());
    }

    #[tokio::test]
    async fn output_is_capped_with_single_marker() {
        let dir = tempfile::tempdir().unwrap();
        let sb = Sandbox::unsandboxed(SandboxConfig { output_limit_bytes: 100, ..policy() });
        let r = sb.run("head -c 5000 /dev/zero | tr '\\0' a", dir.path()).await.unwrap();
        assert!(r.truncated);
        assert!(r.stdout.len() <= 100 + TRUNCATION_MARKER.len());
        assert!(r.stdout.ends_with(TRUNCATION_MARKER));
    }

    #[tokio::test]
    async fn timeout_is_reported_separately_from_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let sb = Sandbox::unsandboxed(SandboxConfig { timeout_secs: 1, ..policy() });
        let started = Instant::now();
        let err = sb.run("echo partial; sleep 30", dir.path()).await.unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(10));
        match err {
            SandboxError::TimedOut { timeout, result } => {
                assert_eq!(timeout, Duration::from_secs(1));
                assert!(result.timed_out);
                assert_eq!(result.stdout, "partial\n");
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn signal_exit_maps_to_128_plus_signal() {
        let dir = tempfile::tempdir().unwrap();
        let r = Sandbox::unsandboxed(policy()).run("kill -9 $$", dir.path()).await.unwrap();
        assert_eq!(r.exit_code, 128 + 9);
    }

    #[cfg(target_os = "linux")]
    fn alive(pid: &str) -> bool {
        match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
            // Field 3 is the state; a zombie is already dead.
            Ok(stat) => stat.rsplit(')').next().map_or(false, |rest| !rest.trim_start().starts_with('Z')),
            Err(_) => false,
        }
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn background_job_dies_with_the_shell() {
        let dir = tempfile::tempdir().unwrap();
        let sb = Sandbox::unsandboxed(policy());
        let r = sb.run("sleep 30 >/dev/null 2>&1 & echo $! > bg.pid", dir.path()).await.unwrap();
        assert!(r.success());

        let pid = std::fs::read_to_string(dir.path().join("bg.pid")).unwrap().trim().to_string();
        let deadline = Instant::now() + Duration::from_secs(5);
        while alive(&pid) && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert!(!alive(&pid), "background sleep {pid} survived the command");
    }
}
