//! The host editor's install-state query and install primitive.
//!
//! [`Host`] is the seam between the resolver/installer core and the editor
//! that actually owns extensions. [`CodeCliHost`] drives the `code` command
//! line; tests substitute a mock or the recording stub from `test_utils`.

use crate::artifact::ArtifactHandle;
use crate::executor::{CommandExecutor, SystemCommandExecutor};
use crate::identifier::PackageIdentifier;
use std::process::Output;
use thiserror::Error;

/// Default command used to reach the editor.
pub const DEFAULT_CODE_COMMAND: &str = "code";

/// Errors reported by the host install primitive.
#[derive(Debug, Error)]
pub enum HostError {
    /// The host command could not be started.
    #[error("failed to run {command}: {source}")]
    Spawn {
        /// The command that was invoked.
        command: String,
        /// The underlying spawn error.
        #[source]
        source: std::io::Error,
    },

    /// The host command exited unsuccessfully.
    #[error("{command} exited with {status}: {stderr}")]
    CommandFailed {
        /// The command that was invoked.
        command: String,
        /// The reported exit status.
        status: String,
        /// Captured standard error, trimmed.
        stderr: String,
    },

    /// The host accepted the artifact but never reported it as installed.
    #[error("{identifier} not reported as installed after {attempts} checks")]
    NotVisibleAfterInstall {
        /// The package that was installed.
        identifier: PackageIdentifier,
        /// Number of install-state checks performed.
        attempts: u32,
    },
}

/// Install-state query and install primitive of the host editor.
#[cfg_attr(test, mockall::automock)]
pub trait Host {
    /// Report whether `identifier` is currently installed.
    fn is_installed(&self, identifier: &PackageIdentifier) -> bool;

    /// Install the artifact referenced by `artifact`.
    ///
    /// # Errors
    ///
    /// Returns [`HostError`] when the host rejects the artifact or cannot be
    /// reached.
    fn install_artifact(&self, artifact: &ArtifactHandle) -> Result<(), HostError>;
}

/// [`Host`] implemented on top of the `code` command line.
///
/// # Examples
///
/// ```no_run
/// use vsix_installer::host::{CodeCliHost, Host};
/// use vsix_installer::identifier::PackageIdentifier;
///
/// let host = CodeCliHost::system("code");
/// let id = PackageIdentifier::try_from("ms-python.python").unwrap();
/// println!("installed: {}", host.is_installed(&id));
/// ```
#[derive(Debug, Clone)]
pub struct CodeCliHost<E = SystemCommandExecutor> {
    executor: E,
    command: String,
}

impl CodeCliHost<SystemCommandExecutor> {
    /// Create a host that spawns `command` on this machine.
    #[must_use]
    pub fn system(command: impl Into<String>) -> Self {
        Self::new(SystemCommandExecutor, command)
    }
}

impl<E: CommandExecutor> CodeCliHost<E> {
    /// Create a host that runs `command` through `executor`.
    #[must_use]
    pub fn new(executor: E, command: impl Into<String>) -> Self {
        Self {
            executor,
            command: command.into(),
        }
    }

    /// List installed extension identifiers as reported by the editor.
    ///
    /// # Errors
    ///
    /// Returns [`HostError`] when the listing command cannot be run or fails.
    pub fn list_extensions(&self) -> Result<Vec<String>, HostError> {
        let output = self.run(&["--list-extensions"])?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_owned)
            .collect())
    }

    fn run(&self, args: &[&str]) -> Result<Output, HostError> {
        let output = self
            .executor
            .run(&self.command, args)
            .map_err(|source| HostError::Spawn {
                command: self.command.clone(),
                source,
            })?;
        log::trace!(
            "{} {} stdout: {}",
            self.command,
            args.join(" "),
            String::from_utf8_lossy(&output.stdout).trim()
        );

        if output.status.success() {
            Ok(output)
        } else {
            Err(HostError::CommandFailed {
                command: self.command.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            })
        }
    }
}

impl<E: CommandExecutor> Host for CodeCliHost<E> {
    fn is_installed(&self, identifier: &PackageIdentifier) -> bool {
        match self.list_extensions() {
            Ok(installed) => installed
                .iter()
                .any(|line| line.eq_ignore_ascii_case(identifier.as_str())),
            Err(err) => {
                log::warn!("could not list installed extensions: {err}");
                false
            }
        }
    }

    fn install_artifact(&self, artifact: &ArtifactHandle) -> Result<(), HostError> {
        log::info!("installing {artifact} from {}", artifact.path());
        self.run(&["--install-extension", artifact.path().as_str()])
            .map(|_| ())
    }
}
