//! Resolve-then-install orchestration.
//!
//! [`install_package`] is the single entry point of the library: it takes
//! one root package as entered by the user and either installs the root and
//! its missing dependencies or fails naming the package and phase at fault.
//! [`plan_package`] performs the same resolution but stops before touching
//! the host.

use crate::artifact::ManifestReader;
use crate::error::{InstallerError, Result};
use crate::host::Host;
use crate::identifier::{PackageIdentifier, parse_input};
use crate::installer::{InstallSettings, Installer, remove_artifact};
use crate::output::write_stderr_line;
use crate::registry::Registry;
use crate::resolver::{ResolveSession, ResolveWarning, Resolver};
use camino::Utf8Path;
use std::io::Write;

/// Collaborators and settings for one install request.
pub struct InstallContext<'a> {
    /// Registry used for version lookups and downloads.
    pub registry: &'a dyn Registry,
    /// Reader for manifests embedded in downloaded artifacts.
    pub manifests: &'a dyn ManifestReader,
    /// Host editor receiving the installs.
    pub host: &'a dyn Host,
    /// Directory artifacts are downloaded into.
    pub download_dir: &'a Utf8Path,
    /// Treat `extensionPack` members as dependencies.
    pub follow_extension_packs: bool,
    /// How the resolved work list is drained.
    pub install: InstallSettings,
    /// Suppress progress output.
    pub quiet: bool,
}

/// Result of a successful install request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    /// The requested package.
    pub root: PackageIdentifier,
    /// Packages queued during resolution, in discovery order.
    pub discovered: Vec<PackageIdentifier>,
    /// Packages handed to the host, in install order.
    pub installed: Vec<PackageIdentifier>,
    /// Non-fatal problems met during resolution.
    pub warnings: Vec<ResolveWarning>,
}

/// Result of a resolve-only request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPlan {
    /// The requested package.
    pub root: PackageIdentifier,
    /// Packages queued during resolution, in discovery order.
    pub discovery_order: Vec<PackageIdentifier>,
    /// Packages in the order they would be installed.
    pub install_order: Vec<PackageIdentifier>,
    /// Non-fatal problems met during resolution.
    pub warnings: Vec<ResolveWarning>,
}

/// Resolve `input` and install it with its missing dependencies.
///
/// `input` is a `publisher.name` identifier or a Marketplace item URL.
///
/// # Errors
///
/// Returns [`InstallerError::Validation`] or
/// [`InstallerError::AlreadyInstalled`] before any network access,
/// [`InstallerError::Registry`] or [`InstallerError::Download`] when
/// resolution fails, and [`InstallerError::Install`] when the host rejects
/// an artifact.
///
/// # Examples
///
/// ```no_run
/// use camino::Utf8Path;
/// use vsix_installer::artifact::VsixManifestReader;
/// use vsix_installer::host::CodeCliHost;
/// use vsix_installer::installer::InstallSettings;
/// use vsix_installer::pipeline::{InstallContext, install_package};
/// use vsix_installer::registry::{MarketplaceClient, client::DEFAULT_REGISTRY_URL};
///
/// let registry = MarketplaceClient::new(DEFAULT_REGISTRY_URL, None);
/// let host = CodeCliHost::system("code");
/// let context = InstallContext {
///     registry: &registry,
///     manifests: &VsixManifestReader,
///     host: &host,
///     download_dir: Utf8Path::new("/tmp/vsix"),
///     follow_extension_packs: false,
///     install: InstallSettings::default(),
///     quiet: false,
/// };
/// let outcome = install_package("ms-python.python", &context, &mut std::io::stderr())?;
/// assert_eq!(outcome.installed.last(), Some(&outcome.root));
/// # Ok::<(), vsix_installer::error::InstallerError>(())
/// ```
pub fn install_package(
    input: &str,
    context: &InstallContext<'_>,
    stderr: &mut dyn Write,
) -> Result<InstallOutcome> {
    let (root, session) = resolve_root(input, context, stderr)?;
    let (work_list, warnings) = session.into_parts();

    if !context.quiet {
        write_stderr_line(
            stderr,
            format!("Installing {} package(s)...", work_list.len()),
        );
    }
    let installed = Installer::new(context.host, context.install).install_all(&work_list)?;

    Ok(InstallOutcome {
        root,
        discovered: work_list.identifiers(),
        installed,
        warnings,
    })
}

/// Resolve `input` without installing anything.
///
/// Downloaded artifacts are removed afterwards unless the context keeps
/// artifacts.
///
/// # Errors
///
/// Returns the same validation, registry and download errors as
/// [`install_package`].
pub fn plan_package(
    input: &str,
    context: &InstallContext<'_>,
    stderr: &mut dyn Write,
) -> Result<InstallPlan> {
    let (root, session) = resolve_root(input, context, stderr)?;
    let (work_list, warnings) = session.into_parts();

    let install_order = work_list
        .install_order(context.install.order)
        .into_iter()
        .map(|artifact| artifact.identifier().clone())
        .collect();
    if !context.install.keep_artifacts {
        work_list.iter().for_each(remove_artifact);
    }

    Ok(InstallPlan {
        root,
        discovery_order: work_list.identifiers(),
        install_order,
        warnings,
    })
}

fn resolve_root(
    input: &str,
    context: &InstallContext<'_>,
    stderr: &mut dyn Write,
) -> Result<(PackageIdentifier, ResolveSession)> {
    let root = parse_input(input)?;
    if context.host.is_installed(&root) {
        return Err(InstallerError::AlreadyInstalled { identifier: root });
    }

    std::fs::create_dir_all(context.download_dir).map_err(|source| {
        InstallerError::DownloadDirectory {
            path: context.download_dir.to_owned(),
            source,
        }
    })?;

    if !context.quiet {
        write_stderr_line(stderr, format!("Resolving {root} and its dependencies..."));
    }
    let resolver = Resolver::new(
        context.registry,
        context.manifests,
        context.host,
        context.download_dir,
    )
    .follow_extension_packs(context.follow_extension_packs);
    let mut session = ResolveSession::new();
    resolver.resolve(&root, &mut session)?;

    for warning in session.warnings() {
        if !context.quiet {
            write_stderr_line(stderr, format!("Warning: {warning}"));
        }
    }
    Ok((root, session))
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
