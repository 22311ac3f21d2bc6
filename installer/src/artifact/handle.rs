//! Local handles to downloaded artifacts.
//!
//! Artifacts are stored as `<publisher>.<name>-<version>.vsix` inside the
//! download directory, so two versions of one package never collide.

use crate::identifier::PackageIdentifier;
use crate::registry::VersionInfo;
use camino::{Utf8Path, Utf8PathBuf};
use std::fmt;

/// The file extension used for downloaded artifacts.
const ARTIFACT_EXTENSION: &str = ".vsix";

/// A downloaded artifact, tagged with the package and version it holds.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use vsix_installer::artifact::ArtifactHandle;
/// use vsix_installer::identifier::PackageIdentifier;
/// use vsix_installer::registry::VersionInfo;
///
/// let id = PackageIdentifier::try_from("pub.a").unwrap();
/// let handle = ArtifactHandle::in_dir(Utf8Path::new("/tmp/vsix"), id, VersionInfo::new("1.0.0"));
/// assert_eq!(handle.path(), Utf8Path::new("/tmp/vsix/pub.a-1.0.0.vsix"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactHandle {
    identifier: PackageIdentifier,
    version: VersionInfo,
    path: Utf8PathBuf,
}

impl ArtifactHandle {
    /// Create a handle for an artifact stored at `path`.
    #[must_use]
    pub fn new(identifier: PackageIdentifier, version: VersionInfo, path: Utf8PathBuf) -> Self {
        Self {
            identifier,
            version,
            path,
        }
    }

    /// Create a handle at the canonical location inside `dir`.
    #[must_use]
    pub fn in_dir(dir: &Utf8Path, identifier: PackageIdentifier, version: VersionInfo) -> Self {
        let path = dir.join(file_name(&identifier, &version));
        Self::new(identifier, version, path)
    }

    /// Return the package identifier.
    #[must_use]
    pub fn identifier(&self) -> &PackageIdentifier {
        &self.identifier
    }

    /// Return the package version.
    #[must_use]
    pub fn version(&self) -> &VersionInfo {
        &self.version
    }

    /// Return the local artifact path.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

impl fmt::Display for ArtifactHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.identifier, self.version)
    }
}

/// Return the artifact filename for `identifier` at `version`.
#[must_use]
pub fn file_name(identifier: &PackageIdentifier, version: &VersionInfo) -> String {
    format!("{identifier}-{version}{ARTIFACT_EXTENSION}")
}
