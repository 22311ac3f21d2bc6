//! External command execution.
//!
//! The `code` CLI is the only process this crate spawns. Routing every
//! invocation through [`CommandExecutor`] keeps the host adapter testable
//! without a VS Code installation.

use std::process::{Command, Output};

/// Abstraction for running external commands.
pub trait CommandExecutor {
    /// Runs a command with arguments and returns the captured output.
    ///
    /// # Errors
    ///
    /// Returns any I/O errors encountered while spawning or running the command.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use vsix_installer::executor::{CommandExecutor, SystemCommandExecutor};
    ///
    /// let executor = SystemCommandExecutor;
    /// let output = executor.run("code", &["--version"])?;
    /// assert!(output.status.success());
    /// # Ok::<(), std::io::Error>(())
    /// ```
    fn run(&self, cmd: &str, args: &[&str]) -> std::io::Result<Output>;
}

/// Executes commands on the host system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandExecutor;

impl CommandExecutor for SystemCommandExecutor {
    fn run(&self, cmd: &str, args: &[&str]) -> std::io::Result<Output> {
        log::trace!("running {cmd} {}", args.join(" "));
        Command::new(cmd).args(args).output()
    }
}

impl<E: CommandExecutor + ?Sized> CommandExecutor for &E {
    fn run(&self, cmd: &str, args: &[&str]) -> std::io::Result<Output> {
        (**self).run(cmd, args)
    }
}
