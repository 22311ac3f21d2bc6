//! Error types for registry lookups and artifact downloads.

use crate::identifier::PackageIdentifier;
use thiserror::Error;

/// Errors arising from the latest-stable version lookup.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The query request failed or timed out.
    #[error("registry query to {url} failed: {reason}")]
    Request {
        /// The query endpoint.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The registry returned no extension for the identifier.
    #[error("package {identifier} not found in registry")]
    NotFound {
        /// The identifier that was looked up.
        identifier: PackageIdentifier,
    },

    /// Every published version is flagged pre-release.
    #[error("package {identifier} has no stable version")]
    NoStableVersion {
        /// The identifier that was looked up.
        identifier: PackageIdentifier,
    },

    /// The query response could not be decoded.
    #[error("invalid registry response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Errors arising from artifact download operations.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// HTTP request failed.
    #[error("download failed for {url}: {reason}")]
    Http {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The requested artifact was not found (HTTP 404).
    #[error("artifact not found: {url}")]
    NotFound {
        /// The URL that returned 404.
        url: String,
    },

    /// I/O error writing or decompressing the downloaded file.
    #[error("I/O error writing download: {0}")]
    Io(#[from] std::io::Error),
}
