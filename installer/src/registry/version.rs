//! Version information selected from a registry lookup.

use std::fmt;

/// The latest non-pre-release version of a package.
///
/// # Examples
///
/// ```
/// use vsix_installer::registry::VersionInfo;
///
/// let version = VersionInfo::new("1.2.3");
/// assert_eq!(version.as_str(), "1.2.3");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionInfo {
    version: String,
}

impl VersionInfo {
    /// Create version information from a version string.
    #[must_use]
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
        }
    }

    /// Return the version string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.version
    }
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.version)
    }
}
