//! Subprocess execution shared by the command tools
//!
//! Each run owns its child for the duration of the call. The child leads
//! its own process group so that a timeout or cancellation can take down
//! everything it spawned: SIGTERM first, SIGKILL once the grace period is
//! over.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use super::outcome::{Outcome, Subject};

/// Program, arguments and working directory of one invocation
#[derive(Debug, Clone)]
pub(crate) struct ProcessSpec {
    program: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
}

impl ProcessSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    /// `sh -c <command>`
    pub fn shell(command: &str) -> Self {
        Self::new("sh").arg("-c").arg(command)
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    #[cfg(test)]
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

/// Runs a [`ProcessSpec`] under a timeout
#[derive(Debug, Clone, Copy)]
pub(crate) struct ProcessRunner {
    pub timeout: Duration,
    pub grace: Duration,
}

impl ProcessRunner {
    pub fn new(timeout: Duration, grace: Duration) -> Self {
        Self { timeout, grace }
    }

    pub async fn run(&self, spec: &ProcessSpec, cancel: &CancellationToken) -> Outcome {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &spec.cwd {
            cmd.current_dir(dir);
        }
        #[cfg(unix)]
        cmd.process_group(0);

        debug!("Spawning {} {:?} in {:?}", spec.program, spec.args, spec.cwd);
        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => return Outcome::transport("Failed to execute command", e),
        };
        let pid = child.id();

        let output = child.wait_with_output();
        tokio::pin!(output);

        let interrupted = tokio::select! {
            result = &mut output => {
                return match result {
                    Ok(out) => {
                        let code = out.status.code().unwrap_or(-1);
                        Outcome::process(compose(&out.stdout, &out.stderr, code), code)
                    }
                    Err(e) => Outcome::transport("Failed to collect command output", e),
                };
            }
            _ = tokio::time::sleep(self.timeout) => Outcome::TimedOut {
                subject: Subject::Command,
                after: self.timeout,
            },
            _ = cancel.cancelled() => Outcome::Cancelled { subject: Subject::Command },
        };

        warn!("{} (pid {:?}): terminating process group", interrupted, pid);
        terminate(pid, output, self.grace).await;
        interrupted
    }
}

/// stdout, then stderr, then the exit code when it is not zero
pub(crate) fn compose(stdout: &[u8], stderr: &[u8], exit_code: i32) -> String {
    let mut result = String::from_utf8_lossy(stdout).into_owned();
    if !stderr.is_empty() {
        result.push_str("\nError: ");
        result.push_str(&String::from_utf8_lossy(stderr));
    }
    if exit_code != 0 {
        result.push_str(&format!("\nExit code: {}", exit_code));
    }
    result
}

async fn terminate<F: Future>(pid: Option<u32>, output: Pin<&mut F>, grace: Duration) {
    signal_group(pid, Signal::Terminate);
    if tokio::time::timeout(grace, output).await.is_err() {
        warn!("pid {:?} still running after {:?}, killing", pid, grace);
        signal_group(pid, Signal::Kill);
    }
}

#[derive(Debug, Clone, Copy)]
enum Signal {
    Terminate,
    Kill,
}

#[cfg(unix)]
fn signal_group(pid: Option<u32>, signal: Signal) {
    let Some(pid) = pid else { return };
    let signo = match signal {
        Signal::Terminate => libc::SIGTERM,
        Signal::Kill => libc::SIGKILL,
    };
    // The child was started with process_group(0), so its pid is the pgid.
    let result = unsafe { libc::killpg(pid as libc::pid_t, signo) };
    if result == -1 {
        debug!(
            "killpg({}, {:?}) failed: {}",
            pid,
            signal,
            std::io::Error::last_os_error()
        );
    }
}

// Without process groups only the direct child is reaped, via kill_on_drop.
#[cfg(not(unix))]
fn signal_group(_pid: Option<u32>, _signal: Signal) {}
