//! Shared test utilities for the installer crate.
//!
//! Provides an in-memory [`StubRegistry`] that serves a fixed dependency
//! graph and writes real `.vsix` archives, a [`RecordingHost`] that tracks
//! install calls, and a [`StubExecutor`] for exercising the `code` CLI host
//! without spawning processes.

use crate::artifact::ArtifactHandle;
use crate::executor::CommandExecutor;
use crate::host::{Host, HostError};
use crate::identifier::PackageIdentifier;
use crate::registry::{DownloadError, Registry, RegistryError, VersionInfo};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::io::{Cursor, Write};
use std::path::Path;
use std::process::{ExitStatus, Output};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code as u32)
}

/// Creates a successful command `Output` with the given stdout.
pub fn stdout_output(stdout: &str) -> Output {
    Output {
        status: exit_status(0),
        stdout: stdout.as_bytes().to_vec(),
        stderr: Vec::new(),
    }
}

/// Creates a failed command `Output` with the given stderr message.
pub fn failure_output(stderr: &str) -> Output {
    Output {
        status: exit_status(1),
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// Represents an expected command invocation for testing.
#[derive(Debug)]
pub struct ExpectedCall {
    /// The command to execute (e.g., "code").
    pub cmd: &'static str,
    /// The arguments to pass to the command.
    pub args: Vec<&'static str>,
    /// The result to return when this command is invoked.
    pub result: std::io::Result<Output>,
}

/// A stub implementation of `CommandExecutor` for testing.
///
/// Records expected command invocations and returns predefined results,
/// allowing tests to verify command execution without side effects.
#[derive(Debug)]
pub struct StubExecutor {
    expected: RefCell<VecDeque<ExpectedCall>>,
}

impl StubExecutor {
    /// Creates a new `StubExecutor` with the given expected calls.
    pub fn new(expected: Vec<ExpectedCall>) -> Self {
        Self {
            expected: RefCell::new(expected.into()),
        }
    }

    /// Asserts that all expected command invocations have been consumed.
    ///
    /// # Panics
    ///
    /// Panics if there are remaining expected calls that were not invoked.
    pub fn assert_finished(&self) {
        assert!(
            self.expected.borrow().is_empty(),
            "expected no further command invocations"
        );
    }
}

impl CommandExecutor for StubExecutor {
    fn run(&self, cmd: &str, args: &[&str]) -> std::io::Result<Output> {
        let mut expected = self.expected.borrow_mut();
        let call = expected.pop_front().expect("unexpected command invocation");

        assert_eq!(call.cmd, cmd);
        assert_eq!(call.args.as_slice(), args);

        call.result
    }
}

/// Builds a `package.json` document declaring `dependencies`.
pub fn package_json(identifier: &str, dependencies: &[&str]) -> String {
    let (publisher, name) = identifier.split_once('.').unwrap_or((identifier, ""));
    serde_json::json!({
        "name": name,
        "publisher": publisher,
        "version": "1.0.0",
        "engines": { "vscode": "^1.80.0" },
        "extensionDependencies": dependencies,
    })
    .to_string()
}

/// Builds a minimal `.vsix` archive.
///
/// `manifest` becomes `extension/package.json` when present; the archive
/// always carries an `extension.vsixmanifest` entry so it is never empty.
///
/// # Panics
///
/// Panics if the in-memory archive cannot be written.
pub fn vsix_bytes(manifest: Option<&str>) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    writer
        .start_file("extension.vsixmanifest", options)
        .expect("start vsixmanifest entry");
    writer
        .write_all(b"<?xml version=\"1.0\" encoding=\"utf-8\"?><PackageManifest/>")
        .expect("write vsixmanifest entry");

    if let Some(json) = manifest {
        writer
            .start_file(crate::artifact::manifest::MANIFEST_ENTRY, options)
            .expect("start package.json entry");
        writer
            .write_all(json.as_bytes())
            .expect("write package.json entry");
    }

    writer.finish().expect("finish archive").into_inner()
}

/// How a [`StubRegistry`] serves a package's artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StubArtifact {
    /// A valid archive declaring the package's dependencies.
    Vsix,
    /// A valid archive without an embedded manifest.
    NoManifest,
    /// Bytes that are not a ZIP archive.
    Corrupt,
    /// A 404 response, after leaving a partial file at the destination.
    NotFound,
}

#[derive(Debug, Clone)]
struct StubPackage {
    version: String,
    dependencies: Vec<String>,
    artifact: StubArtifact,
}

/// In-memory [`Registry`] serving a fixed dependency graph.
///
/// # Examples
///
/// ```
/// use vsix_installer::test_utils::StubRegistry;
///
/// let registry = StubRegistry::new()
///     .with_package("pub.a", &["pub.b"])
///     .with_package("pub.b", &[]);
/// assert!(registry.downloads().is_empty());
/// ```
#[derive(Debug, Default)]
pub struct StubRegistry {
    packages: BTreeMap<PackageIdentifier, StubPackage>,
    queries: RefCell<Vec<String>>,
    downloads: RefCell<Vec<String>>,
}

impl StubRegistry {
    /// Create a registry with no packages.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `identifier` at version `1.0.0` declaring `dependencies`.
    ///
    /// # Panics
    ///
    /// Panics if `identifier` is not a valid package identifier.
    #[must_use]
    pub fn with_package(self, identifier: &str, dependencies: &[&str]) -> Self {
        self.with_artifact(identifier, dependencies, StubArtifact::Vsix)
    }

    /// Publish `identifier` with the given artifact behaviour.
    ///
    /// # Panics
    ///
    /// Panics if `identifier` is not a valid package identifier.
    #[must_use]
    pub fn with_artifact(
        mut self,
        identifier: &str,
        dependencies: &[&str],
        artifact: StubArtifact,
    ) -> Self {
        let id = PackageIdentifier::try_from(identifier).expect("valid stub identifier");
        self.packages.insert(
            id,
            StubPackage {
                version: "1.0.0".to_owned(),
                dependencies: dependencies.iter().map(|&dep| dep.to_owned()).collect(),
                artifact,
            },
        );
        self
    }

    /// Return the identifiers looked up so far, in call order.
    pub fn queries(&self) -> Vec<String> {
        self.queries.borrow().clone()
    }

    /// Return the identifiers downloaded so far, in call order.
    pub fn downloads(&self) -> Vec<String> {
        self.downloads.borrow().clone()
    }

    fn package(&self, identifier: &PackageIdentifier) -> Option<&StubPackage> {
        self.packages.get(identifier)
    }
}

impl Registry for StubRegistry {
    fn query_latest_stable_version(
        &self,
        identifier: &PackageIdentifier,
    ) -> Result<VersionInfo, RegistryError> {
        self.queries.borrow_mut().push(identifier.to_string());
        self.package(identifier)
            .map(|package| VersionInfo::new(package.version.clone()))
            .ok_or_else(|| RegistryError::NotFound {
                identifier: identifier.clone(),
            })
    }

    fn download_artifact(
        &self,
        identifier: &PackageIdentifier,
        version: &VersionInfo,
        dest: &Path,
    ) -> Result<(), DownloadError> {
        self.downloads.borrow_mut().push(identifier.to_string());
        let url = format!("stub://{identifier}/{version}");
        let package = self
            .package(identifier)
            .ok_or_else(|| DownloadError::NotFound { url: url.clone() })?;

        match package.artifact {
            StubArtifact::Vsix => {
                let dependencies: Vec<&str> =
                    package.dependencies.iter().map(String::as_str).collect();
                let json = package_json(identifier.as_str(), &dependencies);
                std::fs::write(dest, vsix_bytes(Some(&json)))?;
            }
            StubArtifact::NoManifest => std::fs::write(dest, vsix_bytes(None))?,
            StubArtifact::Corrupt => std::fs::write(dest, b"not a zip archive")?,
            StubArtifact::NotFound => {
                std::fs::write(dest, b"partial")?;
                return Err(DownloadError::NotFound { url });
            }
        }
        Ok(())
    }
}

/// [`Host`] that records install calls instead of touching an editor.
///
/// Installs succeed only while the artifact file exists, so tests also
/// observe artifacts being removed too early.
#[derive(Debug, Default)]
pub struct RecordingHost {
    installed: RefCell<BTreeSet<PackageIdentifier>>,
    installs: RefCell<Vec<String>>,
    status_checks: RefCell<usize>,
    failing: Option<PackageIdentifier>,
    hide_installs: bool,
}

impl RecordingHost {
    /// Create a host with nothing installed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `identifier` as installed before any request runs.
    ///
    /// # Panics
    ///
    /// Panics if `identifier` is not a valid package identifier.
    #[must_use]
    pub fn with_installed(self, identifier: &str) -> Self {
        let id = PackageIdentifier::try_from(identifier).expect("valid stub identifier");
        self.installed.borrow_mut().insert(id);
        self
    }

    /// Make the install primitive fail for `identifier`.
    ///
    /// # Panics
    ///
    /// Panics if `identifier` is not a valid package identifier.
    #[must_use]
    pub fn failing_on(mut self, identifier: &str) -> Self {
        self.failing = Some(PackageIdentifier::try_from(identifier).expect("valid stub identifier"));
        self
    }

    /// Accept installs without ever reporting them as installed.
    #[must_use]
    pub fn hiding_installs(mut self) -> Self {
        self.hide_installs = true;
        self
    }

    /// Return the identifiers passed to the install primitive, in order.
    pub fn installs(&self) -> Vec<String> {
        self.installs.borrow().clone()
    }

    /// Return how many times the install state was queried.
    pub fn status_checks(&self) -> usize {
        *self.status_checks.borrow()
    }
}

impl Host for RecordingHost {
    fn is_installed(&self, identifier: &PackageIdentifier) -> bool {
        *self.status_checks.borrow_mut() += 1;
        self.installed.borrow().contains(identifier)
    }

    fn install_artifact(&self, artifact: &ArtifactHandle) -> Result<(), HostError> {
        let identifier = artifact.identifier();
        self.installs.borrow_mut().push(identifier.to_string());

        let rejection = if self.failing.as_ref() == Some(identifier) {
            Some("simulated install failure".to_owned())
        } else if !artifact.path().exists() {
            Some(format!("artifact {} does not exist", artifact.path()))
        } else {
            None
        };
        if let Some(stderr) = rejection {
            return Err(HostError::CommandFailed {
                command: "stub".to_owned(),
                status: "exit status: 1".to_owned(),
                stderr,
            });
        }

        if !self.hide_installs {
            self.installed.borrow_mut().insert(identifier.clone());
        }
        Ok(())
    }
}
