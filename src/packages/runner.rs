//! Subprocess execution seam shared by every driver.
//!
//! Drivers never touch `std::process` directly; they go through a
//! [`CommandRunner`] so tests can script package-manager output and the CLI
//! can apply a timeout, cancellation and optional `sudo` in one place.

use crate::error::{Result, StackmatchError};
use crate::ui;
use crate::utils::{platform, sanitize};
use std::io::{ErrorKind, Read};
use std::process::{Child, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(50);
/// How long to keep reading after the child exits while a process it left
/// behind still holds the pipes.
const DRAIN_GRACE: Duration = Duration::from_secs(2);
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(1800);

/// Whether a command changes the system. Only mutating commands are elevated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandMode {
    Query,
    Mutating,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// stdout followed by stderr.
    pub fn combined(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (_, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => format!("{}\n{}", self.stdout.trim_end(), self.stderr),
        }
    }
}

/// Cooperative cancellation shared between the CLI (Ctrl-C) and running
/// subprocesses. Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    deadline: Option<(Instant, Duration)>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derived token sharing this token's flag, with an extra deadline.
    pub fn with_timeout(&self, budget: Duration) -> Self {
        let candidate = (Instant::now() + budget, budget);
        let deadline = match self.deadline {
            Some(existing) if existing.0 <= candidate.0 => existing,
            _ => candidate,
        };
        Self {
            flag: Arc::clone(&self.flag),
            deadline: Some(deadline),
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    fn expired_budget(&self) -> Option<Duration> {
        self.deadline
            .filter(|(at, _)| Instant::now() >= *at)
            .map(|(_, budget)| budget)
    }

    /// Fail fast if cancelled or past the deadline.
    pub fn check(&self, command: &str) -> Result<()> {
        if self.is_cancelled() {
            return Err(StackmatchError::Interrupted {
                command: command.to_string(),
            });
        }
        if let Some(budget) = self.expired_budget() {
            return Err(StackmatchError::TimedOut {
                command: command.to_string(),
                budget,
            });
        }
        Ok(())
    }
}

pub trait CommandRunner: Send + Sync {
    /// Run `program args...` to completion and capture its output. A non-zero
    /// exit is reported through `CommandOutput::success`, not as an error;
    /// errors are reserved for spawn failures, timeouts and cancellation.
    fn run(
        &self,
        program: &str,
        args: &[String],
        mode: CommandMode,
        cancel: &CancelToken,
    ) -> Result<CommandOutput>;

    /// Whether `program` resolves on PATH.
    fn lookup(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}

/// Render an argv for logs and error messages.
pub fn render_command(program: &str, args: &[String]) -> String {
    let parts = std::iter::once(program).chain(args.iter().map(String::as_str));
    let rendered = shlex::try_join(parts.clone())
        .unwrap_or_else(|_| parts.collect::<Vec<_>>().join(" "));
    sanitize::sanitize_for_display(&rendered)
}

/// Pipe reader on its own thread. The buffer is shared so output read so far
/// survives a stream that never reaches EOF.
struct Drain {
    buf: Arc<Mutex<Vec<u8>>>,
    closed: mpsc::Receiver<()>,
}

impl Drain {
    fn spawn(mut source: impl Read + Send + 'static) -> Self {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let (tx, closed) = mpsc::channel();
        let sink = Arc::clone(&buf);
        thread::spawn(move || {
            let mut chunk = [0u8; 8192];
            loop {
                match source.read(&mut chunk) {
                    Ok(0) => break,
                    Ok(n) => {
                        if let Ok(mut b) = sink.lock() {
                            b.extend_from_slice(&chunk[..n]);
                        }
                    }
                    Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                    Err(_) => break,
                }
            }
            let _ = tx.send(());
        });
        Self { buf, closed }
    }

    /// Wait for EOF until `until`, then take whatever was read.
    fn collect(self, until: Instant) -> Vec<u8> {
        let _ = self
            .closed
            .recv_timeout(until.saturating_duration_since(Instant::now()));
        self.buf
            .lock()
            .map(|mut b| std::mem::take(&mut *b))
            .unwrap_or_default()
    }
}

/// Kill the child and, when it leads its own process group, everything it
/// started. The pipe readers are not waited on afterwards.
fn terminate(child: &mut Child, grouped: bool) {
    #[cfg(unix)]
    {
        if grouped && let Ok(pgid) = libc::pid_t::try_from(child.id()) {
            // SAFETY: killpg only sends a signal; the group id is our child's pid.
            unsafe {
                libc::killpg(pgid, libc::SIGKILL);
            }
        }
    }
    #[cfg(not(unix))]
    let _ = grouped;

    let _ = child.kill();
    let _ = child.wait();
}

/// Runs real processes.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    timeout: Duration,
    elevate: bool,
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new(DEFAULT_COMMAND_TIMEOUT, false)
    }
}

impl SystemRunner {
    pub fn new(timeout: Duration, elevate: bool) -> Self {
        Self { timeout, elevate }
    }
}

impl CommandRunner for SystemRunner {
    fn run(
        &self,
        program: &str,
        args: &[String],
        mode: CommandMode,
        cancel: &CancelToken,
    ) -> Result<CommandOutput> {
        let rendered = render_command(program, args);
        cancel.check(&rendered)?;

        let elevated = self.elevate && mode == CommandMode::Mutating;
        let mut cmd = platform::build_program_command(program, args, elevated)?;
        cmd.env("LC_ALL", "C")
            .env("LANG", "C")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // A sudo-wrapped command stays in the foreground group so it can
        // prompt on the terminal and still receives the terminal's Ctrl-C.
        let grouped = cfg!(unix) && !elevated;
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            if grouped {
                cmd.process_group(0);
            }
        }

        ui::debug(&format!(
            "run: {}{}",
            if elevated { "sudo " } else { "" },
            rendered
        ));

        let mut child = cmd.spawn().map_err(|e| StackmatchError::SystemCommandFailed {
            command: rendered.clone(),
            reason: e.to_string(),
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| StackmatchError::SystemCommandFailed {
                command: rendered.clone(),
                reason: "Failed to capture stdout".to_string(),
            })?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| StackmatchError::SystemCommandFailed {
                command: rendered.clone(),
                reason: "Failed to capture stderr".to_string(),
            })?;

        let stdout = Drain::spawn(stdout);
        let stderr = Drain::spawn(stderr);

        let start = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    let stop = if start.elapsed() > self.timeout {
                        Some(StackmatchError::TimedOut {
                            command: rendered.clone(),
                            budget: self.timeout,
                        })
                    } else {
                        cancel.check(&rendered).err()
                    };

                    if let Some(err) = stop {
                        terminate(&mut child, grouped);
                        return Err(err);
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(e) => {
                    terminate(&mut child, grouped);
                    return Err(StackmatchError::SystemCommandFailed {
                        command: rendered,
                        reason: e.to_string(),
                    });
                }
            }
        };

        let until = Instant::now() + DRAIN_GRACE;
        let stdout = stdout.collect(until);
        let stderr = stderr.collect(until);

        Ok(CommandOutput {
            success: status.success(),
            code: status.code(),
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        })
    }
}
