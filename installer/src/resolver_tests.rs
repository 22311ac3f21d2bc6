//! Unit tests for dependency resolution.

use super::*;
use crate::artifact::manifest::MockManifestReader;
use crate::artifact::{ManifestError, VsixManifestReader};
use crate::host::MockHost;
use crate::registry::client::MockRegistry;
use crate::registry::{DownloadError, RegistryError, VersionInfo};
use crate::test_utils::{RecordingHost, StubArtifact, StubRegistry};
use rstest::{fixture, rstest};
use tempfile::TempDir;

fn id(value: &str) -> PackageIdentifier {
    PackageIdentifier::try_from(value).expect("valid identifier")
}

fn discovery(session: &ResolveSession) -> Vec<String> {
    session
        .work_list()
        .identifiers()
        .iter()
        .map(ToString::to_string)
        .collect()
}

fn utf8_dir(temp: &TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("UTF-8 temp dir")
}

#[fixture]
fn download_dir() -> TempDir {
    tempfile::tempdir().expect("temp dir")
}

fn resolve_with(
    registry: &StubRegistry,
    host: &RecordingHost,
    dir: &TempDir,
    root: &str,
) -> (Result<()>, ResolveSession) {
    let resolver = Resolver::new(registry, &VsixManifestReader, host, utf8_dir(dir));
    let mut session = ResolveSession::new();
    let result = resolver.resolve(&id(root), &mut session);
    (result, session)
}

#[rstest]
fn package_without_dependencies_is_queued_alone(download_dir: TempDir) {
    let registry = StubRegistry::new().with_package("pub.a", &[]);
    let host = RecordingHost::new();

    let (result, session) = resolve_with(&registry, &host, &download_dir, "pub.a");

    result.expect("resolution succeeds");
    assert_eq!(discovery(&session), ["pub.a"]);
    assert_eq!(registry.downloads(), ["pub.a"]);
    assert!(session.warnings().is_empty());
}

#[rstest]
fn chain_is_discovered_depth_first(download_dir: TempDir) {
    let registry = StubRegistry::new()
        .with_package("pub.a", &["pub.b"])
        .with_package("pub.b", &["pub.c"])
        .with_package("pub.c", &[]);
    let host = RecordingHost::new();

    let (result, session) = resolve_with(&registry, &host, &download_dir, "pub.a");

    result.expect("resolution succeeds");
    assert_eq!(discovery(&session), ["pub.a", "pub.b", "pub.c"]);
    assert_eq!(session.work_list().dependencies_of(&id("pub.a")), [id("pub.b")]);
    assert_eq!(session.work_list().dependencies_of(&id("pub.b")), [id("pub.c")]);
}

#[rstest]
fn cycle_terminates_with_each_package_once(download_dir: TempDir) {
    let registry = StubRegistry::new()
        .with_package("pub.a", &["pub.b"])
        .with_package("pub.b", &["pub.a"]);
    let host = RecordingHost::new();

    let (result, session) = resolve_with(&registry, &host, &download_dir, "pub.a");

    result.expect("resolution succeeds");
    assert_eq!(session.work_list().len(), 2);
    assert_eq!(discovery(&session), ["pub.b", "pub.a"]);
    assert_eq!(registry.downloads(), ["pub.a", "pub.b"]);
}

#[rstest]
fn diamond_queues_shared_dependency_once_after_both_dependents(download_dir: TempDir) {
    let registry = StubRegistry::new()
        .with_package("pub.a", &["pub.b", "pub.c"])
        .with_package("pub.b", &["pub.d"])
        .with_package("pub.c", &["pub.d"])
        .with_package("pub.d", &[]);
    let host = RecordingHost::new();

    let (result, session) = resolve_with(&registry, &host, &download_dir, "pub.a");

    result.expect("resolution succeeds");
    let list = session.work_list();
    assert_eq!(list.len(), 4);
    assert_eq!(registry.downloads().iter().filter(|d| *d == "pub.d").count(), 1);
    let d = list.position(&id("pub.d")).expect("d queued");
    assert!(d > list.position(&id("pub.b")).expect("b queued"));
    assert!(d > list.position(&id("pub.c")).expect("c queued"));
}

#[rstest]
fn rediscovery_repositions_without_duplicating(download_dir: TempDir) {
    let registry = StubRegistry::new()
        .with_package("pub.a", &["pub.b", "pub.c"])
        .with_package("pub.b", &[])
        .with_package("pub.c", &["pub.b"]);
    let host = RecordingHost::new();

    let (result, session) = resolve_with(&registry, &host, &download_dir, "pub.a");

    result.expect("resolution succeeds");
    assert_eq!(discovery(&session), ["pub.a", "pub.c", "pub.b"]);
    assert_eq!(registry.queries(), ["pub.a", "pub.b", "pub.c"]);
}

#[rstest]
fn installed_dependencies_are_skipped(download_dir: TempDir) {
    let registry = StubRegistry::new()
        .with_package("pub.a", &["pub.b", "pub.c"])
        .with_package("pub.b", &[])
        .with_package("pub.c", &["pub.b"]);
    let host = RecordingHost::new().with_installed("pub.b");

    let (result, session) = resolve_with(&registry, &host, &download_dir, "pub.a");

    result.expect("resolution succeeds");
    assert_eq!(discovery(&session), ["pub.a", "pub.c"]);
    assert!(session.already_installed().contains(&id("pub.b")));
    assert_eq!(registry.downloads(), ["pub.a", "pub.c"]);
    assert_eq!(host.status_checks(), 2, "pub.b is checked once");
}

#[rstest]
fn download_not_found_removes_partial_file_and_keeps_siblings(download_dir: TempDir) {
    let registry = StubRegistry::new()
        .with_package("pub.a", &["pub.b", "pub.c"])
        .with_package("pub.b", &[])
        .with_artifact("pub.c", &[], StubArtifact::NotFound);
    let host = RecordingHost::new();

    let (result, session) = resolve_with(&registry, &host, &download_dir, "pub.a");

    let err = result.expect_err("download should fail");
    assert!(
        matches!(
            err,
            InstallerError::Download { ref identifier, source: DownloadError::NotFound { .. } }
                if identifier.as_str() == "pub.c"
        ),
        "unexpected error: {err}"
    );
    assert_eq!(discovery(&session), ["pub.a", "pub.b"]);
    assert!(!download_dir.path().join("pub.c-1.0.0.vsix").exists());
    assert!(download_dir.path().join("pub.b-1.0.0.vsix").exists());
}

#[rstest]
fn failed_download_keeps_previously_kept_artifact(download_dir: TempDir) {
    let kept = download_dir.path().join("pub.a-1.0.0.vsix");
    std::fs::write(&kept, crate::test_utils::vsix_bytes(None)).expect("seed kept artifact");
    let mut registry = MockRegistry::new();
    registry
        .expect_query_latest_stable_version()
        .returning(|_| Ok(VersionInfo::new("1.0.0")));
    registry.expect_download_artifact().times(1).returning(|_, _, _| {
        Err(DownloadError::Http {
            url: "https://example.test/vspackage".to_owned(),
            reason: "connection reset".to_owned(),
        })
    });
    let host = RecordingHost::new();
    let resolver = Resolver::new(&registry, &VsixManifestReader, &host, utf8_dir(&download_dir));
    let mut session = ResolveSession::new();

    let err = resolver
        .resolve(&id("pub.a"), &mut session)
        .expect_err("download should fail");

    assert!(matches!(err, InstallerError::Download { .. }), "unexpected error: {err}");
    assert!(kept.exists(), "artifact from an earlier run must survive");
}

#[rstest]
fn root_install_state_is_not_queried(download_dir: TempDir) {
    let registry = StubRegistry::new()
        .with_package("pub.a", &["pub.b"])
        .with_package("pub.b", &[]);
    let mut host = MockHost::new();
    host.expect_is_installed()
        .withf(|identifier| identifier.as_str() == "pub.b")
        .times(1)
        .returning(|_| false);
    let resolver = Resolver::new(&registry, &VsixManifestReader, &host, utf8_dir(&download_dir));
    let mut session = ResolveSession::new();

    resolver
        .resolve(&id("pub.a"), &mut session)
        .expect("resolution succeeds");

    assert_eq!(discovery(&session), ["pub.a", "pub.b"]);
}

#[rstest]
fn unknown_dependency_is_a_registry_error(download_dir: TempDir) {
    let registry = StubRegistry::new().with_package("pub.a", &["pub.missing"]);
    let host = RecordingHost::new();

    let (result, session) = resolve_with(&registry, &host, &download_dir, "pub.a");

    let err = result.expect_err("lookup should fail");
    assert!(matches!(
        err,
        InstallerError::Registry { ref identifier, source: RegistryError::NotFound { .. } }
            if identifier.as_str() == "pub.missing"
    ));
    assert_eq!(discovery(&session), ["pub.a"]);
    assert_eq!(registry.downloads(), ["pub.a"]);
}

#[rstest]
#[case::corrupt(StubArtifact::Corrupt, 1)]
#[case::no_manifest(StubArtifact::NoManifest, 0)]
fn unreadable_manifest_degrades_to_no_dependencies(
    download_dir: TempDir,
    #[case] artifact: StubArtifact,
    #[case] expected_warnings: usize,
) {
    let registry = StubRegistry::new()
        .with_package("pub.a", &["pub.b"])
        .with_artifact("pub.b", &["pub.c"], artifact)
        .with_package("pub.c", &[]);
    let host = RecordingHost::new();

    let (result, session) = resolve_with(&registry, &host, &download_dir, "pub.a");

    result.expect("resolution succeeds");
    assert_eq!(discovery(&session), ["pub.a", "pub.b"]);
    assert_eq!(session.warnings().len(), expected_warnings);
    if expected_warnings > 0 {
        assert!(matches!(
            session.warnings().first(),
            Some(ResolveWarning::ManifestUnreadable { identifier, .. }) if identifier.as_str() == "pub.b"
        ));
    }
}

#[rstest]
#[case::no_separator("not-an-identifier")]
#[case::url_fragment("pub.b#x")]
fn invalid_declared_dependency_is_skipped_with_warning(
    download_dir: TempDir,
    #[case] declared: &str,
) {
    let registry = StubRegistry::new()
        .with_package("pub.a", &[declared, "pub.b"])
        .with_package("pub.b", &[]);
    let host = RecordingHost::new();

    let (result, session) = resolve_with(&registry, &host, &download_dir, "pub.a");

    result.expect("resolution succeeds");
    assert_eq!(discovery(&session), ["pub.a", "pub.b"]);
    assert_eq!(registry.downloads(), ["pub.a", "pub.b"]);
    assert!(matches!(
        session.warnings(),
        [ResolveWarning::InvalidDependency { value, .. }] if value == declared
    ));
}

#[rstest]
fn manifest_read_error_is_recorded(download_dir: TempDir) {
    let registry = StubRegistry::new().with_package("pub.a", &[]);
    let host = RecordingHost::new();
    let mut manifests = MockManifestReader::new();
    manifests.expect_read_manifest().times(1).returning(|_| {
        Err(ManifestError::Io(std::io::Error::other("permission denied")))
    });
    let resolver = Resolver::new(&registry, &manifests, &host, utf8_dir(&download_dir));
    let mut session = ResolveSession::new();

    resolver
        .resolve(&id("pub.a"), &mut session)
        .expect("resolution succeeds");

    let warning = session.warnings().first().expect("warning recorded");
    assert!(warning.to_string().contains("permission denied"));
    assert_eq!(session.work_list().len(), 1);
}

#[rstest]
fn registry_failure_skips_download(download_dir: TempDir) {
    let mut registry = MockRegistry::new();
    registry
        .expect_query_latest_stable_version()
        .times(1)
        .returning(|_| {
            Err(RegistryError::Request {
                url: "https://example.test".to_owned(),
                reason: "timed out".to_owned(),
            })
        });
    registry.expect_download_artifact().never();
    let mut host = MockHost::new();
    host.expect_is_installed().returning(|_| false);
    let resolver = Resolver::new(&registry, &VsixManifestReader, &host, utf8_dir(&download_dir));
    let mut session = ResolveSession::new();

    let err = resolver
        .resolve(&id("pub.a"), &mut session)
        .expect_err("lookup should fail");

    assert!(matches!(err, InstallerError::Registry { .. }));
    assert!(session.work_list().is_empty());
}

#[rstest]
fn download_is_requested_at_canonical_path(download_dir: TempDir) {
    let expected = download_dir.path().join("pub.a-2.0.0.vsix");
    let mut registry = MockRegistry::new();
    registry
        .expect_query_latest_stable_version()
        .returning(|_| Ok(VersionInfo::new("2.0.0")));
    registry
        .expect_download_artifact()
        .withf(move |identifier, version, dest| {
            identifier.as_str() == "pub.a" && version.as_str() == "2.0.0" && dest == expected
        })
        .times(1)
        .returning(|_, _, dest| {
            std::fs::write(dest, crate::test_utils::vsix_bytes(None)).map_err(DownloadError::from)
        });
    let host = RecordingHost::new();
    let resolver = Resolver::new(&registry, &VsixManifestReader, &host, utf8_dir(&download_dir));
    let mut session = ResolveSession::new();

    resolver
        .resolve(&id("pub.a"), &mut session)
        .expect("resolution succeeds");

    let handle = session.work_list().get(&id("pub.a")).expect("queued");
    assert_eq!(handle.version().as_str(), "2.0.0");
}

#[rstest]
#[case::packs_ignored(false, &["pub.a", "pub.b"])]
#[case::packs_followed(true, &["pub.a", "pub.b", "pub.c"])]
fn extension_packs_follow_setting(
    download_dir: TempDir,
    #[case] follow: bool,
    #[case] expected: &[&str],
) {
    let registry = StubRegistry::new()
        .with_package("pub.a", &["pub.b"])
        .with_package("pub.b", &[])
        .with_package("pub.c", &[]);
    let host = RecordingHost::new();
    let mut manifests = MockManifestReader::new();
    manifests.expect_read_manifest().returning(|path| {
        let is_root = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with("pub.a-"));
        Ok(Some(crate::artifact::ExtensionManifest {
            extension_dependencies: if is_root { vec!["pub.b".to_owned()] } else { Vec::new() },
            extension_pack: if is_root { vec!["pub.c".to_owned()] } else { Vec::new() },
        }))
    });
    let resolver = Resolver::new(&registry, &manifests, &host, utf8_dir(&download_dir))
        .follow_extension_packs(follow);
    let mut session = ResolveSession::new();

    resolver
        .resolve(&id("pub.a"), &mut session)
        .expect("resolution succeeds");

    assert_eq!(discovery(&session), expected);
}
