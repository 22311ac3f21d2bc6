//! Downloaded artifacts and the manifests embedded in them.
//!
//! # Sub-modules
//!
//! - [`handle`] - [`ArtifactHandle`](handle::ArtifactHandle) and the
//!   artifact file naming policy.
//! - [`manifest`] - Embedded `package.json` model and the ZIP-backed
//!   [`ManifestReader`](manifest::ManifestReader).

pub mod handle;
pub mod manifest;

pub use handle::ArtifactHandle;
pub use manifest::{ExtensionManifest, ManifestError, ManifestReader, VsixManifestReader};
