//! External tool invocation.
//!
//! Everything the engine knows about the system comes from the text output
//! of `nmcli`, `ip`, `getent` and `ping`. [`CommandRunner`] is the seam
//! between that orchestration and the actual process spawning, so the
//! parsing and caching logic can be driven from scripted output in tests.

use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::constants;
use crate::error::ToolError;

/// A fully described external command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Duration,
    pub current_dir: Option<PathBuf>,
}

impl Invocation {
    #[must_use]
    pub fn new(program: &str, args: &[&str], timeout: Duration) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(ToString::to_string).collect(),
            timeout,
            current_dir: None,
        }
    }

    #[must_use]
    pub fn in_dir(mut self, dir: &Path) -> Self {
        self.current_dir = Some(dir.to_path_buf());
        self
    }

    /// True if this runs `program` with arguments starting with `leading`.
    #[must_use]
    pub fn matches(&self, program: &str, leading: &[&str]) -> bool {
        self.program == program
            && self.args.len() >= leading.len()
            && self.args.iter().zip(leading).all(|(a, b)| a == b)
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Captured output of a finished command.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code, `None` when terminated by a signal.
    pub code: Option<i32>,
}

impl ToolOutput {
    /// Successful output with the given stdout.
    #[must_use]
    pub fn from_stdout(stdout: &str) -> Self {
        Self {
            stdout: stdout.to_string(),
            stderr: String::new(),
            code: Some(0),
        }
    }

    /// Failed output with the given stderr.
    #[must_use]
    pub fn from_stderr(stderr: &str, code: i32) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.to_string(),
            code: Some(code),
        }
    }

    #[must_use]
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Whether anything was written to the error channel.
    #[must_use]
    pub fn has_error_output(&self) -> bool {
        !self.stderr.trim().is_empty()
    }
}

/// Runs external commands.
#[cfg_attr(test, mockall::automock)]
pub trait CommandRunner: Send + Sync {
    /// Run the command to completion or until its timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] if the command cannot be spawned, waited on, or
    /// exceeds its timeout. A non-zero exit status is not an error.
    fn run(&self, invocation: &Invocation) -> Result<ToolOutput, ToolError>;
}

/// Spawns real processes with a hard timeout.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<ToolOutput, ToolError> {
        debug!("Running command: `{invocation}`");

        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &invocation.current_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|source| ToolError::Spawn {
            program: invocation.program.clone(),
            source,
        })?;

        // Drain both pipes on their own threads so a chatty child cannot
        // block on a full pipe while we poll for its exit.
        let (pipes_tx, pipes_rx) = mpsc::channel();
        let mut open_pipes = 0;
        if let Some(pipe) = child.stdout.take() {
            open_pipes += 1;
            spawn_reader(Pipe::Stdout, pipe, pipes_tx.clone());
        }
        if let Some(pipe) = child.stderr.take() {
            open_pipes += 1;
            spawn_reader(Pipe::Stderr, pipe, pipes_tx.clone());
        }
        drop(pipes_tx);

        let start = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if start.elapsed() >= invocation.timeout => {
                    warn!(
                        "`{invocation}` timed out after {}s, killing process",
                        invocation.timeout.as_secs()
                    );
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ToolError::Timeout {
                        program: invocation.program.clone(),
                        timeout: invocation.timeout,
                    });
                }
                Ok(None) => thread::sleep(constants::CHILD_POLL_INTERVAL),
                Err(source) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ToolError::Wait {
                        program: invocation.program.clone(),
                        source,
                    });
                }
            }
        };

        // A background grandchild can hold the pipes open after the child
        // exits; the deadline still applies to collecting its output.
        let deadline = start + invocation.timeout;
        let mut output = ToolOutput {
            code: status.code(),
            ..ToolOutput::default()
        };
        for _ in 0..open_pipes {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match pipes_rx.recv_timeout(remaining) {
                Ok((Pipe::Stdout, text)) => output.stdout = text,
                Ok((Pipe::Stderr, text)) => output.stderr = text,
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    warn!(
                        "`{invocation}` exited but its output stayed open past {}s",
                        invocation.timeout.as_secs()
                    );
                    return Err(ToolError::Timeout {
                        program: invocation.program.clone(),
                        timeout: invocation.timeout,
                    });
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }
        }
        debug!(
            "`{invocation}` exited with {:?} ({} bytes stdout, {} bytes stderr)",
            output.code,
            output.stdout.len(),
            output.stderr.len()
        );
        Ok(output)
    }
}

#[derive(Clone, Copy)]
enum Pipe {
    Stdout,
    Stderr,
}

fn spawn_reader<R: Read + Send + 'static>(which: Pipe, mut pipe: R, done: mpsc::Sender<(Pipe, String)>) {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        let _ = done.send((which, String::from_utf8_lossy(&buf).into_owned()));
    });
}
