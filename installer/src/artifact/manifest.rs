//! Embedded manifest reading for downloaded artifacts.
//!
//! A `.vsix` artifact is a ZIP archive whose `extension/package.json`
//! declares the extension's own dependencies. Only the dependency fields are
//! decoded; everything else in the document is ignored.

use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use zip::ZipArchive;
use zip::result::ZipError;

/// Archive entry holding the extension manifest.
pub const MANIFEST_ENTRY: &str = "extension/package.json";

/// Dependency declarations decoded from an artifact's manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionManifest {
    /// Packages that must be installed for this one to work.
    #[serde(default)]
    pub extension_dependencies: Vec<String>,
    /// Packages bundled by an extension pack.
    #[serde(default)]
    pub extension_pack: Vec<String>,
}

impl ExtensionManifest {
    /// Return the declared dependency identifiers in declaration order.
    ///
    /// `extensionPack` members are appended after `extensionDependencies`
    /// when `follow_extension_packs` is set. Repeated entries are dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use vsix_installer::artifact::ExtensionManifest;
    ///
    /// let manifest = ExtensionManifest {
    ///     extension_dependencies: vec!["pub.b".to_owned()],
    ///     extension_pack: vec!["pub.c".to_owned(), "pub.b".to_owned()],
    /// };
    /// assert_eq!(manifest.declared_dependencies(false), ["pub.b"]);
    /// assert_eq!(manifest.declared_dependencies(true), ["pub.b", "pub.c"]);
    /// ```
    #[must_use]
    pub fn declared_dependencies(&self, follow_extension_packs: bool) -> Vec<String> {
        let pack: &[String] = if follow_extension_packs {
            &self.extension_pack
        } else {
            &[]
        };
        let mut declared: Vec<String> = Vec::new();
        for dependency in self.extension_dependencies.iter().chain(pack) {
            if !declared
                .iter()
                .any(|seen| seen.eq_ignore_ascii_case(dependency))
            {
                declared.push(dependency.clone());
            }
        }
        declared
    }
}

/// Errors arising from reading an artifact's embedded manifest.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// The artifact could not be opened or read.
    #[error("manifest I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The artifact is not a readable ZIP archive.
    #[error("unreadable artifact archive: {0}")]
    Archive(#[from] ZipError),

    /// The manifest entry is not valid JSON of the expected shape.
    #[error("invalid manifest JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Trait for reading embedded manifests, enabling test mocking.
#[cfg_attr(test, mockall::automock)]
pub trait ManifestReader {
    /// Read the embedded manifest of the artifact at `artifact_path`.
    ///
    /// Returns `Ok(None)` when the artifact carries no manifest.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError`] when the archive or the manifest entry
    /// cannot be read or decoded.
    fn read_manifest(&self, artifact_path: &Path)
    -> Result<Option<ExtensionManifest>, ManifestError>;
}

/// Default reader opening artifacts with the `zip` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct VsixManifestReader;

impl ManifestReader for VsixManifestReader {
    fn read_manifest(
        &self,
        artifact_path: &Path,
    ) -> Result<Option<ExtensionManifest>, ManifestError> {
        let file = std::fs::File::open(artifact_path)?;
        let mut archive = ZipArchive::new(file)?;
        let mut entry = match archive.by_name(MANIFEST_ENTRY) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(other) => return Err(other.into()),
        };

        let mut json = String::new();
        entry.read_to_string(&mut json)?;
        parse_manifest(&json).map(Some)
    }
}

/// Parse a `package.json` document into an [`ExtensionManifest`].
///
/// A leading byte-order mark is ignored.
///
/// # Errors
///
/// Returns [`ManifestError::Json`] for malformed JSON or dependency fields
/// that are not string arrays.
pub fn parse_manifest(json: &str) -> Result<ExtensionManifest, ManifestError> {
    let json = json.strip_prefix('\u{feff}').unwrap_or(json);
    Ok(serde_json::from_str(json)?)
}
