//! Draining a resolved work list into the host.
//!
//! Artifacts are installed one at a time. The first failure aborts the
//! drain; packages installed before it stay installed.

use crate::artifact::ArtifactHandle;
use crate::error::{InstallerError, Result};
use crate::host::{Host, HostError};
use crate::identifier::PackageIdentifier;
use crate::worklist::{InstallOrder, WorkList};
use std::time::Duration;

/// Default number of install-state checks after each install.
pub const DEFAULT_VERIFY_ATTEMPTS: u32 = 3;

/// Default pause between install-state checks, in milliseconds.
pub const DEFAULT_VERIFY_DELAY_MS: u64 = 1000;

/// Settings controlling how a work list is drained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallSettings {
    /// How the install order is derived.
    pub order: InstallOrder,
    /// Keep artifact files after a successful install.
    pub keep_artifacts: bool,
    /// Install-state checks after each install; zero disables the check.
    pub verify_attempts: u32,
    /// Pause between install-state checks.
    pub verify_delay: Duration,
}

impl Default for InstallSettings {
    fn default() -> Self {
        Self {
            order: InstallOrder::default(),
            keep_artifacts: false,
            verify_attempts: DEFAULT_VERIFY_ATTEMPTS,
            verify_delay: Duration::from_millis(DEFAULT_VERIFY_DELAY_MS),
        }
    }
}

/// Installs the artifacts of a work list through a [`Host`].
pub struct Installer<'a> {
    host: &'a dyn Host,
    settings: InstallSettings,
}

impl<'a> Installer<'a> {
    /// Create an installer using `host`.
    #[must_use]
    pub fn new(host: &'a dyn Host, settings: InstallSettings) -> Self {
        Self { host, settings }
    }

    /// Install every artifact in `work_list`, dependencies first.
    ///
    /// Returns the installed identifiers in install order.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::Install`] naming the first artifact the
    /// host rejected or never reported as installed. Remaining artifacts are
    /// not attempted.
    pub fn install_all(&self, work_list: &WorkList) -> Result<Vec<PackageIdentifier>> {
        let ordered = work_list.install_order(self.settings.order);
        log::debug!(
            "installing {} artifacts in {} order",
            ordered.len(),
            self.settings.order
        );

        let mut installed = Vec::with_capacity(ordered.len());
        for artifact in ordered {
            self.install_one(artifact)
                .map_err(|source| InstallerError::Install {
                    identifier: artifact.identifier().clone(),
                    source,
                })?;
            installed.push(artifact.identifier().clone());

            if !self.settings.keep_artifacts {
                remove_artifact(artifact);
            }
        }
        Ok(installed)
    }

    fn install_one(&self, artifact: &ArtifactHandle) -> std::result::Result<(), HostError> {
        self.host.install_artifact(artifact)?;
        self.verify_installed(artifact.identifier())?;
        log::info!("installed {artifact}");
        Ok(())
    }

    fn verify_installed(&self, identifier: &PackageIdentifier) -> std::result::Result<(), HostError> {
        let attempts = self.settings.verify_attempts;
        for attempt in 1..=attempts {
            if self.host.is_installed(identifier) {
                return Ok(());
            }
            log::debug!("{identifier} not yet visible (check {attempt}/{attempts})");
            if attempt < attempts {
                std::thread::sleep(self.settings.verify_delay);
            }
        }
        if attempts == 0 {
            return Ok(());
        }
        Err(HostError::NotVisibleAfterInstall {
            identifier: identifier.clone(),
            attempts,
        })
    }
}

/// Delete an artifact file, logging rather than failing on error.
pub fn remove_artifact(artifact: &ArtifactHandle) {
    match std::fs::remove_file(artifact.path()) {
        Ok(()) => log::debug!("removed {}", artifact.path()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => log::warn!("could not remove {}: {err}", artifact.path()),
    }
}
