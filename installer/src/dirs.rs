//! Platform directory lookup.
//!
//! Wraps `directories-next` behind the [`BaseDirs`] trait so configuration
//! and download-location logic can be tested without touching the real
//! user profile.

use directories_next::ProjectDirs;
use std::path::PathBuf;

/// Application name used to derive per-user directories.
pub const APPLICATION: &str = "vsix-installer";

/// Source of per-user base directories.
#[cfg_attr(test, mockall::automock)]
pub trait BaseDirs {
    /// Return the per-user cache directory for this application.
    fn cache_dir(&self) -> Option<PathBuf>;

    /// Return the per-user configuration directory for this application.
    fn config_dir(&self) -> Option<PathBuf>;
}

/// [`BaseDirs`] backed by the platform conventions.
///
/// # Examples
///
/// ```no_run
/// use vsix_installer::dirs::{BaseDirs, SystemBaseDirs};
///
/// let dirs = SystemBaseDirs::new();
/// if let Some(cache) = dirs.cache_dir() {
///     println!("downloads go under {}", cache.display());
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct SystemBaseDirs {
    project: Option<ProjectDirs>,
}

impl SystemBaseDirs {
    /// Resolve the platform directories for this application.
    ///
    /// Lookups return `None` when no home directory can be determined.
    #[must_use]
    pub fn new() -> Self {
        Self {
            project: ProjectDirs::from("", "", APPLICATION),
        }
    }
}

impl BaseDirs for SystemBaseDirs {
    fn cache_dir(&self) -> Option<PathBuf> {
        self.project
            .as_ref()
            .map(|project| project.cache_dir().to_path_buf())
    }

    fn config_dir(&self) -> Option<PathBuf> {
        self.project
            .as_ref()
            .map(|project| project.config_dir().to_path_buf())
    }
}
