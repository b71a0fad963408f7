//! Invocation of the external tools the backup drives.
//!
//! Every component builds [`SystemCommand`] values and hands them to a
//! [`CommandRunner`]. Mutating steps go through [`CommandRunner::run`], queries
//! whose output gets parsed go through [`CommandRunner::output`].

use crate::backup::backup_config::ToolPaths;
use crate::backup::function_path;
use crate::backup::report::Reporter;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::{AddFunctionName, AddMsg};
use bon::Builder;
use function_name::named;
use getset::{CopyGetters, Getters};
use std::ffi::{OsStr, OsString};
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq, Getters, CopyGetters)]
pub struct SystemCommand {
    #[getset(get = "pub")]
    program: PathBuf,
    args: Vec<OsString>,
    /// Needs root, the runner decides how to elevate.
    #[getset(get_copy = "pub")]
    needs_root: bool,
}

impl SystemCommand {
    pub fn new<P: Into<PathBuf>>(program: P) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            needs_root: false,
        }
    }

    pub fn privileged<P: Into<PathBuf>>(program: P) -> Self {
        Self {
            needs_root: true,
            ..Self::new(program)
        }
    }

    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        self.args.push(arg.as_ref().to_owned());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_owned()));
        self
    }

    pub fn arg_list(&self) -> &[OsString] {
        &self.args
    }

    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .unwrap_or(self.program.as_os_str())
            .to_string_lossy()
            .into_owned()
    }

    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }
}

impl Display for SystemCommand {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in self.args_lossy() {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " {arg:?}")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

pub trait CommandRunner {
    /// Runs a command for its effect, a non-zero exit is an error.
    fn run(&self, command: &SystemCommand) -> Result<()>;

    /// Runs a query and returns its standard output.
    fn output(&self, command: &SystemCommand) -> Result<String>;
}

/// What every component needs to reach the outside world.
#[derive(Clone)]
pub struct Tools {
    pub paths: Arc<ToolPaths>,
    pub runner: Arc<dyn CommandRunner>,
    pub reporter: Reporter,
}

/// Runs commands as child processes of this one.
#[derive(Clone, Debug, Builder)]
pub struct ProcessRunner {
    #[builder(into)]
    sudo: PathBuf,
    #[builder(default = true)]
    use_sudo: bool,
    #[builder(default)]
    dry_run: bool,
    #[builder(default)]
    reporter: Reporter,
}

impl ProcessRunner {
    fn resolve(&self, command: &SystemCommand) -> SystemCommand {
        if command.needs_root && self.use_sudo {
            SystemCommand::new(&self.sudo)
                .arg(&command.program)
                .args(&command.args)
        } else {
            SystemCommand {
                needs_root: false,
                ..command.clone()
            }
        }
    }

    fn command(program: &Path, args: &[OsString]) -> Command {
        let mut command = Command::new(program);
        command.args(args);
        command
    }
}

impl CommandRunner for ProcessRunner {
    #[named]
    fn run(&self, command: &SystemCommand) -> Result<()> {
        let command = self.resolve(command);
        self.reporter.command(&command);
        if self.dry_run {
            tracing::info!("Dry run, not executing: {command}");
            return Ok(());
        }

        let status = Self::command(&command.program, &command.args)
            .status()
            .map_err(Error::from)
            .add_msg(format!("Failed to start `{command}`"))
            .add_fn_name(function_path!())?;
        if !status.success() {
            return Err(Error::command_failed(command.to_string(), status.to_string()));
        }

        Ok(())
    }

    #[named]
    fn output(&self, command: &SystemCommand) -> Result<String> {
        let command = self.resolve(command);
        tracing::debug!("Querying `{command}`");
        let output = Self::command(&command.program, &command.args)
            .env("LC_ALL", "C")
            .stdin(Stdio::null())
            .stderr(Stdio::inherit())
            .output()
            .map_err(Error::from)
            .add_msg(format!("Failed to start `{command}`"))
            .add_fn_name(function_path!())?;
        if !output.status.success() {
            return Err(Error::command_failed(
                command.to_string(),
                output.status.to_string(),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use std::cell::RefCell;

    type Handler = Box<dyn FnMut(&SystemCommand) -> Result<String>>;

    /// Records every command and answers it from a scripted handler.
    pub struct FakeRunner {
        calls: RefCell<Vec<SystemCommand>>,
        handler: RefCell<Handler>,
    }

    impl FakeRunner {
        pub fn new<F: FnMut(&SystemCommand) -> Result<String> + 'static>(handler: F) -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
                handler: RefCell::new(Box::new(handler)),
            }
        }

        pub fn silent() -> Self {
            Self::new(|_| Ok(String::new()))
        }

        pub fn tools(self: &Arc<Self>) -> Tools {
            Tools {
                paths: Arc::new(ToolPaths::default()),
                runner: self.clone(),
                reporter: Reporter::new(false),
            }
        }

        pub fn calls(&self) -> Vec<SystemCommand> {
            self.calls.borrow().clone()
        }

        pub fn programs(&self) -> Vec<String> {
            self.calls
                .borrow()
                .iter()
                .map(SystemCommand::program_name)
                .collect()
        }

        pub fn calls_to(&self, program: &str) -> Vec<SystemCommand> {
            self.calls
                .borrow()
                .iter()
                .filter(|c| c.program_name() == program)
                .cloned()
                .collect()
        }
    }

    impl CommandRunner for FakeRunner {
        fn run(&self, command: &SystemCommand) -> Result<()> {
            self.output(command).map(|_| ())
        }

        fn output(&self, command: &SystemCommand) -> Result<String> {
            self.calls.borrow_mut().push(command.clone());
            let mut handler = self.handler.borrow_mut();
            (&mut **handler)(command)
        }
    }
}
