//! Error types for the VSIX installer.
//!
//! [`InstallerError`] is the single terminal outcome reported to callers of
//! the pipeline. Failures of the core algorithm name the identifier involved
//! and the [`Phase`] that failed; ambient failures (configuration, local
//! filesystem) carry no phase.

use crate::config::ConfigError;
use crate::host::HostError;
use crate::identifier::{IdentifierError, PackageIdentifier};
use crate::registry::{DownloadError, RegistryError};
use camino::Utf8PathBuf;
use std::fmt;
use thiserror::Error;

/// Stage of an install request in which a failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Input validation, before any network access.
    Validation,
    /// Latest-stable version lookup.
    Registry,
    /// Artifact download.
    Download,
    /// Host install primitive.
    Install,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Validation => "validation",
            Self::Registry => "registry",
            Self::Download => "download",
            Self::Install => "install",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while resolving or installing a package.
#[derive(Debug, Error)]
pub enum InstallerError {
    /// The requested package identifier is malformed.
    #[error(transparent)]
    Validation(#[from] IdentifierError),

    /// The requested package is already installed in the host.
    #[error("{identifier} is already installed")]
    AlreadyInstalled {
        /// The root package identifier.
        identifier: PackageIdentifier,
    },

    /// Looking up the latest stable version failed.
    #[error("registry lookup failed for {identifier}: {source}")]
    Registry {
        /// The package being looked up.
        identifier: PackageIdentifier,
        /// The underlying registry error.
        #[source]
        source: RegistryError,
    },

    /// Downloading an artifact failed.
    #[error("download failed for {identifier}: {source}")]
    Download {
        /// The package being downloaded.
        identifier: PackageIdentifier,
        /// The underlying download error.
        #[source]
        source: DownloadError,
    },

    /// The host failed to install an artifact.
    #[error("install failed for {identifier}: {source}")]
    Install {
        /// The package whose install failed.
        identifier: PackageIdentifier,
        /// The underlying host error.
        #[source]
        source: HostError,
    },

    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The download directory could not be created.
    #[error("cannot prepare download directory {path}: {source}")]
    DownloadDirectory {
        /// The directory that could not be created.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl InstallerError {
    /// Return the phase in which the failure occurred.
    ///
    /// The already-installed precondition and ambient failures have no
    /// phase.
    ///
    /// # Examples
    ///
    /// ```
    /// use vsix_installer::error::{InstallerError, Phase};
    /// use vsix_installer::identifier::IdentifierError;
    ///
    /// let err = InstallerError::from(IdentifierError::Empty);
    /// assert_eq!(err.phase(), Some(Phase::Validation));
    /// ```
    #[must_use]
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Self::Validation(_) => Some(Phase::Validation),
            Self::Registry { .. } => Some(Phase::Registry),
            Self::Download { .. } => Some(Phase::Download),
            Self::Install { .. } => Some(Phase::Install),
            Self::AlreadyInstalled { .. } | Self::Config(_) | Self::DownloadDirectory { .. } => {
                None
            }
        }
    }

    /// Return the package identifier named by the failure, if any.
    #[must_use]
    pub fn identifier(&self) -> Option<&PackageIdentifier> {
        match self {
            Self::AlreadyInstalled { identifier }
            | Self::Registry { identifier, .. }
            | Self::Download { identifier, .. }
            | Self::Install { identifier, .. } => Some(identifier),
            Self::Validation(_) | Self::Config(_) | Self::DownloadDirectory { .. } => None,
        }
    }
}

/// Result type alias using [`InstallerError`].
pub type Result<T> = std::result::Result<T, InstallerError>;
