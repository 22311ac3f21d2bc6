//! Registry access trait and the Marketplace HTTP implementation.
//!
//! Provides a trait-based abstraction over the two registry round-trips the
//! resolver needs (latest-stable lookup and artifact download), enabling
//! dependency injection for testing.

use super::error::{DownloadError, RegistryError};
use super::query::{parse_latest_stable, query_body};
use super::version::VersionInfo;
use crate::identifier::PackageIdentifier;
use flate2::read::GzDecoder;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

/// The public Visual Studio Marketplace.
pub const DEFAULT_REGISTRY_URL: &str = "https://marketplace.visualstudio.com";

/// `Accept` header value required by the gallery query API.
const QUERY_ACCEPT: &str = "application/json;api-version=3.0-preview.1";

const USER_AGENT: &str = concat!("vsix-installer/", env!("CARGO_PKG_VERSION"));

/// Trait for the registry round-trips performed during resolution.
///
/// # Examples
///
/// ```
/// use vsix_installer::registry::MarketplaceClient;
///
/// let client = MarketplaceClient::new("https://marketplace.visualstudio.com", None);
/// // Use client.query_latest_stable_version(&id) in production
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait Registry {
    /// Look up the latest version of `identifier` not flagged pre-release.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails, times out, or yields no
    /// matching version.
    fn query_latest_stable_version(
        &self,
        identifier: &PackageIdentifier,
    ) -> Result<VersionInfo, RegistryError>;

    /// Download the artifact for `identifier` at `version` into `dest`.
    ///
    /// Implementations must not leave a partially written file at `dest`
    /// when they fail.
    ///
    /// # Errors
    ///
    /// Returns an error on a non-success HTTP status, a transport error, or
    /// a local write error.
    fn download_artifact(
        &self,
        identifier: &PackageIdentifier,
        version: &VersionInfo,
        dest: &Path,
    ) -> Result<(), DownloadError>;
}

/// Transfer encoding of a download body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentEncoding {
    /// The body is the artifact itself.
    Identity,
    /// The body is gzip-compressed.
    Gzip,
}

impl ContentEncoding {
    /// Classify a `Content-Encoding` header value.
    ///
    /// # Examples
    ///
    /// ```
    /// use vsix_installer::registry::client::ContentEncoding;
    ///
    /// assert_eq!(ContentEncoding::from_header(Some("GZIP")), ContentEncoding::Gzip);
    /// assert_eq!(ContentEncoding::from_header(None), ContentEncoding::Identity);
    /// ```
    #[must_use]
    pub fn from_header(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("gzip") || v.eq_ignore_ascii_case("x-gzip") => {
                Self::Gzip
            }
            _ => Self::Identity,
        }
    }
}

/// Marketplace client using `ureq`.
///
/// Automatic response decompression is disabled at the transport level so
/// that gzip bodies are decoded explicitly in [`write_body`].
pub struct MarketplaceClient {
    base_url: String,
    agent: ureq::Agent,
}

impl MarketplaceClient {
    /// Create a client for the registry at `base_url`.
    ///
    /// `timeout` bounds each whole request; `None` keeps the transport
    /// default.
    #[must_use]
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(timeout)
            .build();
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            agent: ureq::Agent::new_with_config(config),
        }
    }

    /// Return the extension query endpoint.
    ///
    /// # Examples
    ///
    /// ```
    /// use vsix_installer::registry::MarketplaceClient;
    ///
    /// let client = MarketplaceClient::new("https://example.test/", None);
    /// assert_eq!(
    ///     client.query_url(),
    ///     "https://example.test/_apis/public/gallery/extensionquery"
    /// );
    /// ```
    #[must_use]
    pub fn query_url(&self) -> String {
        format!("{}/_apis/public/gallery/extensionquery", self.base_url)
    }

    /// Return the package download URL for `identifier` at `version`.
    #[must_use]
    pub fn download_url(&self, identifier: &PackageIdentifier, version: &VersionInfo) -> String {
        format!(
            "{}/_apis/public/gallery/publishers/{}/vsextensions/{}/{}/vspackage",
            self.base_url,
            identifier.publisher(),
            identifier.name(),
            version
        )
    }
}

impl Registry for MarketplaceClient {
    fn query_latest_stable_version(
        &self,
        identifier: &PackageIdentifier,
    ) -> Result<VersionInfo, RegistryError> {
        let url = self.query_url();
        let body = query_body(identifier)?;
        let request_error = |reason: String| RegistryError::Request {
            url: url.clone(),
            reason,
        };

        let response = self
            .agent
            .post(url.as_str())
            .header("Accept", QUERY_ACCEPT)
            .header("Content-Type", "application/json")
            .header("User-Agent", USER_AGENT)
            .send(body.as_str())
            .map_err(|e| request_error(e.to_string()))?;
        let json = response
            .into_body()
            .read_to_string()
            .map_err(|e| request_error(e.to_string()))?;

        parse_latest_stable(&json, identifier)
    }

    fn download_artifact(
        &self,
        identifier: &PackageIdentifier,
        version: &VersionInfo,
        dest: &Path,
    ) -> Result<(), DownloadError> {
        let url = self.download_url(identifier, version);
        log::debug!("downloading {identifier}@{version} from {url}");

        let response = self
            .agent
            .get(url.as_str())
            .header("User-Agent", USER_AGENT)
            .call()
            .map_err(|e| map_ureq_error(&url, &e))?;
        let encoding = ContentEncoding::from_header(
            response
                .headers()
                .get("content-encoding")
                .and_then(|value| value.to_str().ok()),
        );

        write_body(response.into_body().into_reader(), encoding, dest)
    }
}

/// Stream `reader` into `dest`, decoding gzip bodies first.
///
/// The bytes land in a temporary file beside `dest` that is renamed into
/// place only once the whole body has been written, so a failed transfer
/// never leaves a partial artifact behind.
///
/// # Errors
///
/// Returns [`DownloadError::Io`] if reading, decompressing, or writing
/// fails.
pub fn write_body(
    reader: impl Read,
    encoding: ContentEncoding,
    dest: &Path,
) -> Result<(), DownloadError> {
    let dir = dest
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut temp = tempfile::NamedTempFile::new_in(dir)?;

    match encoding {
        ContentEncoding::Identity => {
            let mut reader = reader;
            std::io::copy(&mut reader, temp.as_file_mut())?;
        }
        ContentEncoding::Gzip => {
            std::io::copy(&mut GzDecoder::new(reader), temp.as_file_mut())?;
        }
    }

    temp.persist(dest).map_err(|e| DownloadError::Io(e.error))?;
    Ok(())
}

/// Map a ureq error to a [`DownloadError`].
fn map_ureq_error(url: &str, err: &ureq::Error) -> DownloadError {
    match err {
        ureq::Error::StatusCode(404) => DownloadError::NotFound {
            url: url.to_owned(),
        },
        other => DownloadError::Http {
            url: url.to_owned(),
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use rstest::rstest;
    use std::io::Write;

    struct FailingReader {
        sent: bool,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.sent {
                return Err(std::io::Error::other("connection reset"));
            }
            self.sent = true;
            let chunk = b"partial";
            let len = chunk.len().min(buf.len());
            buf[..len].copy_from_slice(&chunk[..len]);
            Ok(len)
        }
    }

    fn identifier() -> PackageIdentifier {
        PackageIdentifier::try_from("ms-python.python").expect("valid identifier")
    }

    #[test]
    fn download_url_contains_publisher_name_and_version() {
        let client = MarketplaceClient::new(DEFAULT_REGISTRY_URL, None);
        let url = client.download_url(&identifier(), &VersionInfo::new("2024.1.0"));
        assert_eq!(
            url,
            concat!(
                "https://marketplace.visualstudio.com/_apis/public/gallery/",
                "publishers/ms-python/vsextensions/python/2024.1.0/vspackage"
            )
        );
    }

    #[test]
    fn trailing_slash_is_trimmed_from_base_url() {
        let client = MarketplaceClient::new("https://example.test///", None);
        assert!(client.query_url().starts_with("https://example.test/_apis/"));
    }

    #[rstest]
    #[case::gzip(Some("gzip"), ContentEncoding::Gzip)]
    #[case::x_gzip(Some("x-gzip"), ContentEncoding::Gzip)]
    #[case::padded(Some(" gzip "), ContentEncoding::Gzip)]
    #[case::identity(Some("identity"), ContentEncoding::Identity)]
    #[case::brotli(Some("br"), ContentEncoding::Identity)]
    #[case::absent(None, ContentEncoding::Identity)]
    fn classifies_content_encoding(#[case] header: Option<&str>, #[case] expected: ContentEncoding) {
        assert_eq!(ContentEncoding::from_header(header), expected);
    }

    #[test]
    fn write_body_copies_identity_body() {
        let temp = tempfile::tempdir().expect("temp dir");
        let dest = temp.path().join("pub.a-1.0.0.vsix");

        write_body(&b"plain bytes"[..], ContentEncoding::Identity, &dest).expect("write");

        assert_eq!(std::fs::read(&dest).expect("read back"), b"plain bytes");
    }

    #[test]
    fn write_body_decompresses_gzip_body() {
        let temp = tempfile::tempdir().expect("temp dir");
        let dest = temp.path().join("pub.a-1.0.0.vsix");
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"zip archive bytes").expect("compress");
        let compressed = encoder.finish().expect("finish gzip");

        write_body(compressed.as_slice(), ContentEncoding::Gzip, &dest).expect("write");

        assert_eq!(std::fs::read(&dest).expect("read back"), b"zip archive bytes");
    }

    #[test]
    fn failed_transfer_leaves_no_file() {
        let temp = tempfile::tempdir().expect("temp dir");
        let dest = temp.path().join("pub.a-1.0.0.vsix");

        let result = write_body(FailingReader { sent: false }, ContentEncoding::Identity, &dest);

        assert!(matches!(result, Err(DownloadError::Io(_))));
        assert!(!dest.exists());
        let leftovers = std::fs::read_dir(temp.path()).expect("list dir").count();
        assert_eq!(leftovers, 0, "temporary file should be removed");
    }

    #[test]
    fn corrupt_gzip_body_leaves_no_file() {
        let temp = tempfile::tempdir().expect("temp dir");
        let dest = temp.path().join("pub.a-1.0.0.vsix");

        let result = write_body(&b"not gzip"[..], ContentEncoding::Gzip, &dest);

        assert!(result.is_err());
        assert!(!dest.exists());
    }

    #[test]
    fn map_ureq_error_maps_404_to_not_found() {
        let err = ureq::Error::StatusCode(404);
        let mapped = map_ureq_error("https://example.test/vspackage", &err);
        assert!(matches!(mapped, DownloadError::NotFound { .. }));
    }

    #[test]
    fn map_ureq_error_maps_other_status_to_http_error() {
        let err = ureq::Error::StatusCode(500);
        let mapped = map_ureq_error("https://example.test/vspackage", &err);
        assert!(matches!(mapped, DownloadError::Http { .. }));
    }
}
