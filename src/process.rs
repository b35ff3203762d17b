use crate::error::{Error, Result};
use crate::util::display_path;
use std::path::PathBuf;
use std::process::{Command, ExitStatus};

/// A single external tool run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Short tool name used in logs and errors.
    pub tool: String,
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
}

impl Invocation {
    pub fn new(tool: impl Into<String>, program: impl Into<PathBuf>) -> Self {
        Invocation {
            tool: tool.into(),
            program: program.into(),
            args: vec![],
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn command_line(&self) -> String {
        let mut parts = vec![display_path(&self.program)];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Runs external tools; the build only ever talks to tools through this.
pub trait ToolRunner {
    /// Succeeds only when the tool exits with code 0.
    fn run(&mut self, invocation: &Invocation) -> Result<()>;
}

/// Spawns the real program and waits for it, output passed through.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

#[cfg(unix)]
fn signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn signal(_: &ExitStatus) -> Option<i32> {
    None
}

pub(crate) fn check_status(tool: &str, status: ExitStatus) -> Result<()> {
    if status.success() {
        return Ok(());
    }

    match (status.code(), signal(&status)) {
        (Some(code), _) => Err(Error::ToolExit {
            tool: tool.to_string(),
            code,
        }),
        (None, Some(signal)) => Err(Error::ToolSignal {
            tool: tool.to_string(),
            signal,
        }),
        (None, None) => Err(Error::ToolExit {
            tool: tool.to_string(),
            code: -1,
        }),
    }
}

impl ToolRunner for SystemRunner {
    fn run(&mut self, invocation: &Invocation) -> Result<()> {
        log::info!("Executing {}", invocation.command_line());

        let mut command = Command::new(&invocation.program);
        command.args(&invocation.args);
        if let Some(cwd) = &invocation.cwd {
            command.current_dir(cwd);
        }

        let status = command.status().map_err(|source| Error::ToolSpawn {
            tool: invocation.tool.clone(),
            source,
        })?;

        check_status(&invocation.tool, status)
    }
}
