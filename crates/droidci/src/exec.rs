//! External command execution.
//!
//! Every step reaches the build tool and the device bridge through
//! [`CommandExecutor`], so orchestration never depends on which binaries
//! are installed. [`SystemExecutor`] spawns real processes;
//! [`RecordingExecutor`] only records what would have run.

use crate::error::{PipelineError, PipelineResult};
use std::cell::RefCell;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::thread::sleep;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A program, its arguments and the directory it runs in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandLine {
    program: OsString,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
}

impl CommandLine {
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
            cwd: None,
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    #[must_use]
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn program(&self) -> &OsStr {
        &self.program
    }

    pub fn cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    /// Program followed by arguments, lossily converted for display and matching.
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(&self.program)
            .chain(&self.args)
            .map(|s| s.to_string_lossy().into_owned())
            .collect()
    }

    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }
        cmd
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.argv().join(" "))
    }
}

/// Exit status of a finished command. `code` is `None` when it was killed by a signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommandStatus {
    pub code: Option<i32>,
}

impl CommandStatus {
    pub const SUCCESS: Self = Self { code: Some(0) };

    pub fn from_code(code: i32) -> Self {
        Self { code: Some(code) }
    }

    pub fn success(self) -> bool {
        self.code == Some(0)
    }
}

impl From<ExitStatus> for CommandStatus {
    fn from(status: ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit code {code}"),
            None => f.write_str("termination by signal"),
        }
    }
}

pub trait CommandExecutor {
    /// Run `cmd` to completion. Only failing to run at all is an `Err`;
    /// a non-zero exit is reported through the returned status.
    fn run(&self, cmd: &CommandLine) -> PipelineResult<CommandStatus>;
}

/// Run `cmd` and turn a non-zero exit into [`PipelineError::CommandFailed`].
pub fn run_checked(exec: &dyn CommandExecutor, cmd: &CommandLine) -> PipelineResult<()> {
    info!(command = %cmd, "running command");
    let status = exec.run(cmd)?;
    if !status.success() {
        error!(command = %cmd, %status, "command failed, aborting");
        return Err(PipelineError::CommandFailed {
            command: cmd.to_string(),
            status,
        });
    }
    Ok(())
}

/// Spawns real child processes, inheriting stdio.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemExecutor {
    timeout: Option<Duration>,
}

impl SystemExecutor {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

impl CommandExecutor for SystemExecutor {
    fn run(&self, cmd: &CommandLine) -> PipelineResult<CommandStatus> {
        let mut command = cmd.to_command();

        let Some(timeout) = self.timeout else {
            let status = command.status().map_err(|source| PipelineError::Spawn {
                command: cmd.to_string(),
                source,
            })?;
            return Ok(status.into());
        };

        let mut child = command.spawn().map_err(|source| PipelineError::Spawn {
            command: cmd.to_string(),
            source,
        })?;
        let deadline = Instant::now() + timeout;

        loop {
            let polled = child.try_wait().map_err(|source| PipelineError::Wait {
                command: cmd.to_string(),
                source,
            })?;
            if let Some(status) = polled {
                return Ok(status.into());
            }

            if Instant::now() >= deadline {
                debug!(command = %cmd, "deadline reached, killing child");
                let _ = child.kill();
                let _ = child.wait();
                return Err(PipelineError::Timeout {
                    command: cmd.to_string(),
                    timeout,
                });
            }

            sleep(POLL_INTERVAL);
        }
    }
}

type RunHook = Box<dyn Fn(&CommandLine)>;

/// Records every command instead of running it.
///
/// Commands succeed unless their rendered command line contains a string
/// registered with [`RecordingExecutor::fail_when`].
#[derive(Default)]
pub struct RecordingExecutor {
    calls: RefCell<Vec<CommandLine>>,
    failures: Vec<(String, i32)>,
    hook: Option<RunHook>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn fail_when(mut self, needle: impl Into<String>, code: i32) -> Self {
        self.failures.push((needle.into(), code));
        self
    }

    /// Called with each command before it is recorded.
    #[must_use]
    pub fn on_run(mut self, hook: impl Fn(&CommandLine) + 'static) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    pub fn calls(&self) -> Vec<CommandLine> {
        self.calls.borrow().clone()
    }

    pub fn command_lines(&self) -> Vec<String> {
        self.calls.borrow().iter().map(ToString::to_string).collect()
    }
}

impl CommandExecutor for RecordingExecutor {
    fn run(&self, cmd: &CommandLine) -> PipelineResult<CommandStatus> {
        if let Some(hook) = &self.hook {
            hook(cmd);
        }
        self.calls.borrow_mut().push(cmd.clone());

        let line = cmd.to_string();
        let status = self
            .failures
            .iter()
            .find(|(needle, _)| line.contains(needle.as_str()))
            .map_or(CommandStatus::SUCCESS, |(_, code)| {
                CommandStatus::from_code(*code)
            });
        Ok(status)
    }
}
