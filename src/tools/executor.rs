use std::{
    ffi::OsString,
    io::Read,
    process::{Command, Stdio},
    thread::JoinHandle,
    time::{Duration, Instant},
};

use crate::foundation::error::{FolioError, FolioResult};

/// One external program invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolCommand {
    /// Program name, resolved through `PATH`.
    pub program: String,
    /// Arguments, passed verbatim (no shell).
    pub args: Vec<OsString>,
    /// Kill the process if it has not exited after this long.
    pub timeout: Option<Duration>,
}

impl ToolCommand {
    /// Command with no arguments and no timeout.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: None,
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set or clear the timeout.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Arguments rendered lossily, for logs and mock matching.
    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }
}

/// Captured result of a finished process.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code; `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    /// Captured stdout.
    pub stdout: Vec<u8>,
    /// Captured stderr.
    pub stderr: Vec<u8>,
}

impl ToolOutput {
    /// Successful empty output, handy for mocks.
    pub fn ok() -> Self {
        Self {
            code: Some(0),
            ..Self::default()
        }
    }

    /// `true` on exit code 0.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Turn a non-zero exit into [`FolioError::ExternalTool`].
    pub fn check(self, tool: &str) -> FolioResult<Self> {
        if self.success() {
            return Ok(self);
        }
        let stderr = String::from_utf8_lossy(&self.stderr);
        let status = match self.code {
            Some(c) => format!("exit status {c}"),
            None => "terminated by signal".to_string(),
        };
        let stderr = stderr.trim();
        Err(FolioError::tool(
            tool,
            if stderr.is_empty() {
                status
            } else {
                format!("{status}: {stderr}")
            },
        ))
    }
}

/// Narrow seam in front of every external program the pipeline runs.
///
/// Returns `Err` only when the process could not be run to completion (spawn failure, I/O error,
/// timeout). A process that ran and exited non-zero is reported through [`ToolOutput::code`].
pub trait ToolExecutor: Send + Sync {
    /// Run `cmd` to completion.
    fn run(&self, cmd: &ToolCommand) -> FolioResult<ToolOutput>;
}

/// Executes commands with `std::process`, enforcing [`ToolCommand::timeout`].
#[derive(Clone, Debug)]
pub struct SystemExecutor {
    poll_interval: Duration,
}

impl Default for SystemExecutor {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(20),
        }
    }
}

impl SystemExecutor {
    /// Executor with the default exit-poll interval.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ToolExecutor for SystemExecutor {
    fn run(&self, cmd: &ToolCommand) -> FolioResult<ToolOutput> {
        tracing::debug!(program = %cmd.program, args = ?cmd.args_lossy(), "spawn external tool");

        let mut child = Command::new(&cmd.program)
            .args(&cmd.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                FolioError::tool(
                    &cmd.program,
                    format!("failed to spawn (is it installed and on PATH?): {e}"),
                )
            })?;

        // Drain both pipes off-thread so a chatty tool cannot block on a full pipe while we poll.
        let stdout_drain = drain(child.stdout.take());
        let stderr_drain = drain(child.stderr.take());

        let deadline = cmd.timeout.map(|t| Instant::now() + t);
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(FolioError::tool(
                        &cmd.program,
                        format!("failed to wait for exit: {e}"),
                    ));
                }
            }
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(FolioError::tool(
                        &cmd.program,
                        format!(
                            "timed out after {:.1}s",
                            cmd.timeout.unwrap_or_default().as_secs_f64()
                        ),
                    ));
                }
            }
            std::thread::sleep(self.poll_interval);
        };

        Ok(ToolOutput {
            code: status.code(),
            stdout: join_drain(stdout_drain, &cmd.program)?,
            stderr: join_drain(stderr_drain, &cmd.program)?,
        })
    }
}

type Drain = Option<JoinHandle<std::io::Result<Vec<u8>>>>;

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Drain {
    pipe.map(|mut r| {
        std::thread::spawn(move || {
            let mut bytes = Vec::new();
            r.read_to_end(&mut bytes)?;
            Ok(bytes)
        })
    })
}

fn join_drain(handle: Drain, program: &str) -> FolioResult<Vec<u8>> {
    match handle {
        Some(h) => h
            .join()
            .map_err(|_| FolioError::tool(program, "output drain thread panicked"))?
            .map_err(|e| FolioError::tool(program, format!("output read failed: {e}"))),
        None => Ok(Vec::new()),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/tools/executor.rs"]
mod tests;
