//! Installer configuration.
//!
//! Settings are layered, lowest precedence first:
//!
//! 1. built-in defaults;
//! 2. a TOML file (`--config PATH`, else `config.toml` in the per-user
//!    configuration directory when it exists);
//! 3. the `VSIX_INSTALLER_REGISTRY` environment variable;
//! 4. command-line flags, applied by the binary.
//!
//! ```toml
//! registry_url = "https://marketplace.visualstudio.com"
//! download_dir = "/var/cache/vsix"
//! keep_artifacts = false
//! timeout_secs = 60
//! install_order = "topological"
//! follow_extension_packs = false
//! code_command = "code"
//! verify_attempts = 3
//! verify_delay_ms = 1000
//! ```

use crate::dirs::{APPLICATION, BaseDirs};
use crate::host::DEFAULT_CODE_COMMAND;
use crate::installer::{DEFAULT_VERIFY_ATTEMPTS, DEFAULT_VERIFY_DELAY_MS, InstallSettings};
use crate::registry::client::DEFAULT_REGISTRY_URL;
use crate::worklist::InstallOrder;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Environment variable overriding the registry URL.
pub const REGISTRY_ENV: &str = "VSIX_INSTALLER_REGISTRY";

/// Name of the configuration file inside the configuration directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Errors arising from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("cannot read config file {path}: {source}")]
    Read {
        /// Path to the configuration file.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML of the expected shape.
    #[error("invalid config file {path}: {source}")]
    Parse {
        /// Path to the configuration file.
        path: Utf8PathBuf,
        /// The underlying parse error.
        #[source]
        source: Box<toml::de::Error>,
    },

    /// The registry URL is not an absolute http(s) URL.
    #[error("invalid registry URL \"{url}\": {reason}")]
    InvalidRegistryUrl {
        /// The rejected URL.
        url: String,
        /// Why the URL was rejected.
        reason: String,
    },

    /// A platform directory is not valid UTF-8.
    #[error("{what} directory is not valid UTF-8: {path}")]
    NonUtf8Path {
        /// Which directory was being resolved.
        what: &'static str,
        /// Lossy rendering of the offending path.
        path: String,
    },
}

/// Effective installer settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InstallerConfig {
    /// Base URL of the extension registry.
    pub registry_url: String,
    /// Directory artifacts are downloaded into.
    pub download_dir: Option<Utf8PathBuf>,
    /// Keep artifact files after installing them.
    pub keep_artifacts: bool,
    /// Per-request timeout in seconds; unset keeps the transport default.
    pub timeout_secs: Option<u64>,
    /// How the install order is derived.
    pub install_order: InstallOrder,
    /// Treat `extensionPack` members as dependencies.
    pub follow_extension_packs: bool,
    /// Command used to reach the editor.
    pub code_command: String,
    /// Install-state checks after each install; zero disables the check.
    pub verify_attempts: u32,
    /// Pause between install-state checks, in milliseconds.
    pub verify_delay_ms: u64,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            registry_url: DEFAULT_REGISTRY_URL.to_owned(),
            download_dir: None,
            keep_artifacts: false,
            timeout_secs: None,
            install_order: InstallOrder::default(),
            follow_extension_packs: false,
            code_command: DEFAULT_CODE_COMMAND.to_owned(),
            verify_attempts: DEFAULT_VERIFY_ATTEMPTS,
            verify_delay_ms: DEFAULT_VERIFY_DELAY_MS,
        }
    }
}

impl InstallerConfig {
    /// Parse configuration from TOML text. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns the TOML error for malformed input or unknown keys.
    ///
    /// # Examples
    ///
    /// ```
    /// use vsix_installer::config::InstallerConfig;
    ///
    /// let config = InstallerConfig::from_toml_str("keep_artifacts = true").unwrap();
    /// assert!(config.keep_artifacts);
    /// assert_eq!(config.code_command, "code");
    /// ```
    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Read configuration from the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] or [`ConfigError::Parse`].
    pub fn from_file(path: &Utf8Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::from_toml_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source: Box::new(source),
        })
    }

    /// Load defaults overlaid with the configuration file, if any.
    ///
    /// An explicit path must exist; the default location is optional.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when a file exists but cannot be read or
    /// parsed.
    pub fn load(explicit: Option<&Utf8Path>, dirs: &dyn BaseDirs) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            log::debug!("loading config from {path}");
            return Self::from_file(path);
        }
        match default_config_path(dirs)? {
            Some(path) if path.is_file() => {
                log::debug!("loading config from {path}");
                Self::from_file(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Apply environment overrides read through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(REGISTRY_ENV).filter(|value| !value.trim().is_empty()) {
            log::debug!("registry URL overridden by {REGISTRY_ENV}");
            self.registry_url = url.trim().to_owned();
        }
    }

    /// Check that the settings are usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidRegistryUrl`] unless `registry_url` is
    /// an absolute http(s) URL.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidRegistryUrl {
            url: self.registry_url.clone(),
            reason,
        };
        let url = Url::parse(&self.registry_url).map_err(|err| invalid(err.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme \"{}\"", url.scheme())));
        }
        if url.host_str().is_none() {
            return Err(invalid("missing host".to_owned()));
        }
        Ok(())
    }

    /// Return the per-request timeout, if configured.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Return the settings used to drain the work list.
    #[must_use]
    pub fn install_settings(&self) -> InstallSettings {
        InstallSettings {
            order: self.install_order,
            keep_artifacts: self.keep_artifacts,
            verify_attempts: self.verify_attempts,
            verify_delay: Duration::from_millis(self.verify_delay_ms),
        }
    }

    /// Return the download directory.
    ///
    /// Falls back to `<cache>/downloads`, then to a directory under the
    /// system temporary directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NonUtf8Path`] when the fallback directory is
    /// not valid UTF-8.
    pub fn resolve_download_dir(&self, dirs: &dyn BaseDirs) -> Result<Utf8PathBuf, ConfigError> {
        if let Some(dir) = &self.download_dir {
            return Ok(dir.clone());
        }
        if let Some(cache) = dirs.cache_dir() {
            return utf8("cache", cache).map(|dir| dir.join("downloads"));
        }
        utf8("temporary", std::env::temp_dir()).map(|dir| dir.join(APPLICATION))
    }
}

/// Return the default configuration file location.
///
/// # Errors
///
/// Returns [`ConfigError::NonUtf8Path`] when the configuration directory is
/// not valid UTF-8.
pub fn default_config_path(dirs: &dyn BaseDirs) -> Result<Option<Utf8PathBuf>, ConfigError> {
    dirs.config_dir()
        .map(|dir| utf8("configuration", dir).map(|dir| dir.join(CONFIG_FILE_NAME)))
        .transpose()
}

fn utf8(what: &'static str, path: std::path::PathBuf) -> Result<Utf8PathBuf, ConfigError> {
    Utf8PathBuf::from_path_buf(path).map_err(|path| ConfigError::NonUtf8Path {
        what,
        path: path.display().to_string(),
    })
}
