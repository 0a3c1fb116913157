//! Bounded execution of external helper tools
//!
//! Every helper process is owned by a `ChildGuard` so that it is killed and
//! reaped on every exit path: success, output cap, deadline and errors. On
//! unix the helper leads its own process group and the whole group is
//! killed, which also stops interpreters' child processes.
//! Stdout is read on a separate thread through a `take(limit + 1)` reader
//! and collected with `recv_timeout`, which keeps the caller responsive to
//! the time budget even when the helper stops producing output.

use std::ffi::OsString;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use crate::budget::TimeBudget;
use crate::error::HelperError;

/// Stderr kept for error messages
const MAX_STDERR: usize = 64 * 1024;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A helper invocation: program, arguments and working directory
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: String,
    args: Vec<OsString>,
    cwd: PathBuf,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>, cwd: &Path) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.to_path_buf(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Render for logs
    pub fn display(&self) -> String {
        let mut out = self.program.clone();
        for arg in &self.args {
            out.push(' ');
            out.push_str(&arg.to_string_lossy());
        }
        out
    }
}

/// Locate a tool in PATH, or accept an explicit path to an existing file
pub fn locate_tool(program: &str) -> Result<PathBuf, HelperError> {
    which::which(program).map_err(|_| HelperError::NotFound(program.to_string()))
}

/// Run `cmd` to completion and return its stdout.
///
/// Fails when the tool is missing, stdout exceeds `max_output` bytes, the
/// budget runs out, or the process exits unsuccessfully.
pub fn run_bounded(
    cmd: &ToolCommand,
    budget: &TimeBudget,
    max_output: usize,
) -> Result<Vec<u8>, HelperError> {
    if budget.expired() {
        return Err(HelperError::DeadlineExceeded(budget.limit()));
    }

    let program = locate_tool(&cmd.program)?;
    tracing::debug!(command = %cmd.display(), "running helper");

    let mut command = Command::new(&program);
    command
        .args(&cmd.args)
        .current_dir(&cmd.cwd)
        .env("LC_ALL", "C")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    let mut child = command
        .spawn()
        .map_err(|source| HelperError::Spawn {
            program: cmd.program.clone(),
            source,
        })?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let mut guard = ChildGuard::new(child);

    let stderr_rx = stderr.map(spawn_stderr_reader);

    let stdout = stdout.ok_or_else(|| {
        HelperError::Io(io::Error::new(io::ErrorKind::BrokenPipe, "stdout not captured"))
    })?;
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let result = stdout
            .take(max_output as u64 + 1)
            .read_to_end(&mut buf)
            .map(|_| buf);
        let _ = tx.send(result);
    });

    let output = match rx.recv_timeout(budget.remaining()) {
        Ok(Ok(buf)) => buf,
        Ok(Err(e)) => return Err(HelperError::Io(e)),
        Err(RecvTimeoutError::Timeout) => {
            return Err(HelperError::DeadlineExceeded(budget.limit()));
        }
        Err(RecvTimeoutError::Disconnected) => {
            return Err(HelperError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "stdout reader exited",
            )));
        }
    };

    if output.len() > max_output {
        return Err(HelperError::OutputTooLarge {
            size: output.len(),
            limit: max_output,
        });
    }

    let status = guard.wait_within(budget)?;
    if !status.success() {
        let stderr = stderr_rx
            .and_then(|rx| rx.recv_timeout(Duration::from_millis(200)).ok())
            .unwrap_or_default();
        return Err(HelperError::Failed {
            status: status.to_string(),
            stderr: stderr.trim().to_string(),
        });
    }

    Ok(output)
}

/// Try `commands` in order and return the first successful stdout.
///
/// The output cap and the deadline end the chain early since every
/// later attempt would hit them too.
pub fn run_first_available(
    commands: &[ToolCommand],
    budget: &TimeBudget,
    max_output: usize,
) -> Result<Vec<u8>, HelperError> {
    let mut last_error = HelperError::NotFound("no command configured".to_string());
    for cmd in commands {
        match run_bounded(cmd, budget, max_output) {
            Ok(output) => return Ok(output),
            Err(err @ HelperError::OutputTooLarge { .. }) => return Err(err),
            Err(err) if err.is_deadline() => return Err(err),
            Err(err) => {
                tracing::debug!(command = %cmd.display(), error = %err, "helper attempt failed");
                last_error = err;
            }
        }
    }
    Err(last_error)
}

/// Drain stderr fully, keeping the first `MAX_STDERR` bytes
fn spawn_stderr_reader<R: Read + Send + 'static>(mut stderr: R) -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut kept = Vec::new();
        let _ = (&mut stderr).take(MAX_STDERR as u64).read_to_end(&mut kept);
        let _ = io::copy(&mut stderr, &mut io::sink());
        let _ = tx.send(String::from_utf8_lossy(&kept).into_owned());
    });
    rx
}

/// Owns a child process; kills and reaps it unless it was waited on
struct ChildGuard {
    child: Option<Child>,
}

impl ChildGuard {
    fn new(child: Child) -> Self {
        Self { child: Some(child) }
    }

    /// Poll for exit until the budget runs out
    fn wait_within(&mut self, budget: &TimeBudget) -> Result<ExitStatus, HelperError> {
        let child = match self.child.as_mut() {
            Some(child) => child,
            None => {
                return Err(HelperError::Io(io::Error::new(
                    io::ErrorKind::Other,
                    "child already reaped",
                )))
            }
        };

        loop {
            if let Some(status) = child.try_wait()? {
                self.child = None;
                return Ok(status);
            }
            if budget.expired() {
                return Err(HelperError::DeadlineExceeded(budget.limit()));
            }
            thread::sleep(POLL_INTERVAL.min(budget.remaining()));
        }
    }

    fn kill_and_reap(&mut self) {
        if let Some(mut child) = self.child.take() {
            #[cfg(unix)]
            kill_process_group(&child);
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        self.kill_and_reap();
    }
}

/// SIGKILL the group led by `child`, which has not been reaped yet
#[cfg(unix)]
fn kill_process_group(child: &Child) {
    let Ok(pid) = libc::pid_t::try_from(child.id()) else {
        return;
    };
    // SAFETY: plain syscall; the group id cannot be reused while the leader is unreaped
    let rc = unsafe { libc::kill(-pid, libc::SIGKILL) };
    if rc != 0 {
        tracing::debug!(pid, error = %io::Error::last_os_error(), "process group already gone");
    }
}
