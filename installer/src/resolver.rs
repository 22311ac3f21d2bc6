//! Dependency resolution and artifact fetching.
//!
//! [`Resolver::resolve`] walks the dependency graph depth-first in
//! declaration order, one registry round-trip per newly seen package. All
//! state lives in a [`ResolveSession`] owned by the caller, so concurrent
//! top-level requests never share a work list.
//!
//! Per package the resolver:
//!
//! 1. moves an already queued package to the tail of the work list and stops;
//! 2. stops if the host already has the dependency installed;
//! 3. looks up the latest stable version and downloads the artifact;
//! 4. appends the artifact to the work list;
//! 5. reads the embedded manifest and descends into each declared
//!    dependency.
//!
//! Manifest failures never abort resolution; they are recorded as
//! [`ResolveWarning`]s and the package is treated as having no dependencies.

use crate::artifact::{ArtifactHandle, ManifestReader};
use crate::error::{InstallerError, Result};
use crate::host::Host;
use crate::identifier::{IdentifierError, PackageIdentifier};
use crate::registry::Registry;
use crate::worklist::WorkList;
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::BTreeSet;
use std::fmt;

/// Non-fatal problem encountered during resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveWarning {
    /// The artifact's manifest could not be read; no dependencies were
    /// followed for it.
    ManifestUnreadable {
        /// The package whose artifact was inspected.
        identifier: PackageIdentifier,
        /// Description of the read failure.
        reason: String,
    },

    /// A manifest declared a dependency that is not a valid identifier.
    InvalidDependency {
        /// The package declaring the dependency.
        dependent: PackageIdentifier,
        /// The rejected declaration.
        value: String,
        /// Why the declaration was rejected.
        error: IdentifierError,
    },
}

impl fmt::Display for ResolveWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ManifestUnreadable { identifier, reason } => {
                write!(f, "could not read manifest of {identifier}: {reason}")
            }
            Self::InvalidDependency {
                dependent,
                value,
                error,
            } => write!(f, "{dependent} declares invalid dependency \"{value}\": {error}"),
        }
    }
}

/// State of one top-level resolution request.
#[derive(Debug, Default)]
pub struct ResolveSession {
    work_list: WorkList,
    already_installed: BTreeSet<PackageIdentifier>,
    warnings: Vec<ResolveWarning>,
}

impl ResolveSession {
    /// Create an empty session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the artifacts queued so far.
    #[must_use]
    pub fn work_list(&self) -> &WorkList {
        &self.work_list
    }

    /// Return dependencies skipped because the host already has them.
    #[must_use]
    pub fn already_installed(&self) -> &BTreeSet<PackageIdentifier> {
        &self.already_installed
    }

    /// Return the warnings recorded so far.
    #[must_use]
    pub fn warnings(&self) -> &[ResolveWarning] {
        &self.warnings
    }

    /// Consume the session, returning the work list and warnings.
    #[must_use]
    pub fn into_parts(self) -> (WorkList, Vec<ResolveWarning>) {
        (self.work_list, self.warnings)
    }
}

/// Resolves a package and its transitive dependencies into a work list.
///
/// # Examples
///
/// ```no_run
/// use vsix_installer::artifact::VsixManifestReader;
/// use vsix_installer::host::CodeCliHost;
/// use vsix_installer::identifier::PackageIdentifier;
/// use vsix_installer::registry::{MarketplaceClient, client::DEFAULT_REGISTRY_URL};
/// use vsix_installer::resolver::{ResolveSession, Resolver};
///
/// let registry = MarketplaceClient::new(DEFAULT_REGISTRY_URL, None);
/// let host = CodeCliHost::system("code");
/// let resolver = Resolver::new(&registry, &VsixManifestReader, &host, "/tmp/vsix");
///
/// let mut session = ResolveSession::new();
/// let root = PackageIdentifier::try_from("ms-python.python").unwrap();
/// resolver.resolve(&root, &mut session)?;
/// println!("{} artifacts queued", session.work_list().len());
/// # Ok::<(), vsix_installer::error::InstallerError>(())
/// ```
pub struct Resolver<'a> {
    registry: &'a dyn Registry,
    manifests: &'a dyn ManifestReader,
    host: &'a dyn Host,
    download_dir: Utf8PathBuf,
    follow_extension_packs: bool,
}

impl<'a> Resolver<'a> {
    /// Create a resolver downloading artifacts into `download_dir`.
    #[must_use]
    pub fn new(
        registry: &'a dyn Registry,
        manifests: &'a dyn ManifestReader,
        host: &'a dyn Host,
        download_dir: impl Into<Utf8PathBuf>,
    ) -> Self {
        Self {
            registry,
            manifests,
            host,
            download_dir: download_dir.into(),
            follow_extension_packs: false,
        }
    }

    /// Also follow `extensionPack` members as dependencies.
    #[must_use]
    pub fn follow_extension_packs(mut self, follow: bool) -> Self {
        self.follow_extension_packs = follow;
        self
    }

    /// Return the directory artifacts are downloaded into.
    #[must_use]
    pub fn download_dir(&self) -> &Utf8Path {
        &self.download_dir
    }

    /// Resolve `identifier` and its dependency closure into `session`.
    ///
    /// The caller is expected to have validated the root identifier and
    /// rejected it if already installed; the host is not asked about the
    /// root again.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::Registry`] or [`InstallerError::Download`]
    /// for the first package whose lookup or download fails. Artifacts
    /// queued before the failure stay in the session's work list.
    pub fn resolve(&self, identifier: &PackageIdentifier, session: &mut ResolveSession) -> Result<()> {
        let mut stack: Vec<(PackageIdentifier, std::vec::IntoIter<PackageIdentifier>)> = Vec::new();
        if let Some(dependencies) = self.queue(identifier, session)? {
            stack.push((identifier.clone(), dependencies.into_iter()));
        }

        while let Some((dependent, pending)) = stack.last_mut() {
            let Some(dependency) = pending.next() else {
                stack.pop();
                continue;
            };
            session.work_list.record_dependency(dependent, &dependency);
            if let Some(dependencies) = self.visit(&dependency, session)? {
                stack.push((dependency, dependencies.into_iter()));
            }
        }

        Ok(())
    }

    /// Process a single package. Returns its declared dependencies when it
    /// was newly queued, so the caller descends into them.
    fn visit(
        &self,
        identifier: &PackageIdentifier,
        session: &mut ResolveSession,
    ) -> Result<Option<Vec<PackageIdentifier>>> {
        if session.work_list.reposition_to_tail(identifier) {
            log::debug!("{identifier} already queued; moved to tail");
            return Ok(None);
        }
        if session.already_installed.contains(identifier) || self.host.is_installed(identifier) {
            log::debug!("{identifier} already installed; skipping");
            session.already_installed.insert(identifier.clone());
            return Ok(None);
        }
        self.queue(identifier, session)
    }

    /// Download a package not yet queued and push it onto the work list.
    fn queue(
        &self,
        identifier: &PackageIdentifier,
        session: &mut ResolveSession,
    ) -> Result<Option<Vec<PackageIdentifier>>> {
        let artifact = self.fetch(identifier)?;
        let path = artifact.path().to_owned();
        session.work_list.push(artifact);
        Ok(Some(self.declared_dependencies(identifier, &path, session)))
    }

    fn fetch(&self, identifier: &PackageIdentifier) -> Result<ArtifactHandle> {
        let version = self
            .registry
            .query_latest_stable_version(identifier)
            .map_err(|source| InstallerError::Registry {
                identifier: identifier.clone(),
                source,
            })?;
        log::debug!("{identifier}: latest stable version is {version}");

        let artifact = ArtifactHandle::in_dir(&self.download_dir, identifier.clone(), version);
        let existed = artifact.path().exists();
        if let Err(source) = self.registry.download_artifact(
            identifier,
            artifact.version(),
            artifact.path().as_std_path(),
        ) {
            if !existed {
                remove_partial_download(artifact.path());
            }
            return Err(InstallerError::Download {
                identifier: identifier.clone(),
                source,
            });
        }
        log::info!("downloaded {artifact} to {}", artifact.path());
        Ok(artifact)
    }

    fn declared_dependencies(
        &self,
        identifier: &PackageIdentifier,
        artifact_path: &Utf8Path,
        session: &mut ResolveSession,
    ) -> Vec<PackageIdentifier> {
        let declared = match self.manifests.read_manifest(artifact_path.as_std_path()) {
            Ok(Some(manifest)) => manifest.declared_dependencies(self.follow_extension_packs),
            Ok(None) => Vec::new(),
            Err(err) => {
                log::warn!("treating {identifier} as having no dependencies: {err}");
                session.warnings.push(ResolveWarning::ManifestUnreadable {
                    identifier: identifier.clone(),
                    reason: err.to_string(),
                });
                Vec::new()
            }
        };

        let mut dependencies = Vec::with_capacity(declared.len());
        for value in declared {
            match PackageIdentifier::try_from(value.as_str()) {
                Ok(dependency) => dependencies.push(dependency),
                Err(error) => {
                    log::warn!("{identifier} declares invalid dependency \"{value}\": {error}");
                    session.warnings.push(ResolveWarning::InvalidDependency {
                        dependent: identifier.clone(),
                        value,
                        error,
                    });
                }
            }
        }
        if !dependencies.is_empty() {
            log::debug!(
                "{identifier} depends on {}",
                dependencies
                    .iter()
                    .map(PackageIdentifier::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
        dependencies
    }
}

fn remove_partial_download(path: &Utf8Path) {
    match std::fs::remove_file(path) {
        Ok(()) => log::debug!("removed partial download {path}"),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => log::warn!("could not remove partial download {path}: {err}"),
    }
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
