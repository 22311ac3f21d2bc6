//! Marketplace extension query model.
//!
//! The gallery `extensionquery` endpoint takes a filter document and returns
//! every published version of the matching extension, newest first. Each
//! version carries a property list; pre-release builds are tagged with
//! [`PRE_RELEASE_PROPERTY`].

use super::error::RegistryError;
use super::version::VersionInfo;
use crate::identifier::PackageIdentifier;
use serde::{Deserialize, Serialize};

/// Filter type selecting an extension by its `publisher.name` identifier.
pub const FILTER_TYPE_EXTENSION_NAME: u32 = 7;

/// Version property marking a pre-release build.
pub const PRE_RELEASE_PROPERTY: &str = "Microsoft.VisualStudio.Code.PreRelease";

/// Gallery query flags.
pub mod flags {
    /// Include every published version, not only the latest.
    pub const INCLUDE_VERSIONS: u32 = 0x1;
    /// Include the file list of each version.
    pub const INCLUDE_FILES: u32 = 0x2;
    /// Include the property list of each version.
    pub const INCLUDE_VERSION_PROPERTIES: u32 = 0x10;
    /// Exclude versions that failed Marketplace validation.
    pub const EXCLUDE_NON_VALIDATED: u32 = 0x20;
    /// Include asset URIs for each version.
    pub const INCLUDE_ASSET_URI: u32 = 0x80;
}

/// Flags sent with every version lookup.
pub const QUERY_FLAGS: u32 = flags::INCLUDE_VERSIONS
    | flags::INCLUDE_FILES
    | flags::INCLUDE_VERSION_PROPERTIES
    | flags::EXCLUDE_NON_VALIDATED
    | flags::INCLUDE_ASSET_URI;

#[derive(Debug, Serialize)]
struct ExtensionQuery<'a> {
    filters: Vec<QueryFilter<'a>>,
    flags: u32,
}

#[derive(Debug, Serialize)]
struct QueryFilter<'a> {
    criteria: Vec<Criterion<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Criterion<'a> {
    filter_type: u32,
    value: &'a str,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<QueryResult>,
}

#[derive(Debug, Deserialize)]
struct QueryResult {
    #[serde(default)]
    extensions: Vec<ExtensionEntry>,
}

#[derive(Debug, Deserialize)]
struct ExtensionEntry {
    #[serde(default)]
    versions: Vec<VersionEntry>,
}

#[derive(Debug, Deserialize)]
struct VersionEntry {
    version: String,
    #[serde(default)]
    properties: Vec<VersionProperty>,
}

#[derive(Debug, Deserialize)]
struct VersionProperty {
    key: String,
    #[serde(default)]
    value: Option<String>,
}

impl VersionEntry {
    fn is_pre_release(&self) -> bool {
        self.properties.iter().any(|property| {
            property.key == PRE_RELEASE_PROPERTY
                && property
                    .value
                    .as_deref()
                    .is_some_and(|value| value.eq_ignore_ascii_case("true"))
        })
    }
}

/// Build the JSON request body looking up `identifier`.
///
/// # Errors
///
/// Returns an error if serialization fails.
///
/// # Examples
///
/// ```
/// use vsix_installer::identifier::PackageIdentifier;
/// use vsix_installer::registry::query::query_body;
///
/// let id = PackageIdentifier::try_from("pub.a").unwrap();
/// let body = query_body(&id).unwrap();
/// assert!(body.contains(r#""filterType":7"#));
/// assert!(body.contains(r#""value":"pub.a""#));
/// ```
pub fn query_body(identifier: &PackageIdentifier) -> Result<String, serde_json::Error> {
    let query = ExtensionQuery {
        filters: vec![QueryFilter {
            criteria: vec![Criterion {
                filter_type: FILTER_TYPE_EXTENSION_NAME,
                value: identifier.as_str(),
            }],
        }],
        flags: QUERY_FLAGS,
    };
    serde_json::to_string(&query)
}

/// Select the latest stable version from a query response body.
///
/// Versions are considered in the order the registry returned them; the
/// first one not flagged pre-release wins.
///
/// # Errors
///
/// Returns [`RegistryError::Decode`] for malformed JSON,
/// [`RegistryError::NotFound`] when the response names no extension, and
/// [`RegistryError::NoStableVersion`] when every version is pre-release.
pub fn parse_latest_stable(
    json: &str,
    identifier: &PackageIdentifier,
) -> Result<VersionInfo, RegistryError> {
    let response: QueryResponse = serde_json::from_str(json)?;
    let extension = response
        .results
        .into_iter()
        .next()
        .and_then(|result| result.extensions.into_iter().next())
        .ok_or_else(|| RegistryError::NotFound {
            identifier: identifier.clone(),
        })?;

    extension
        .versions
        .into_iter()
        .find(|entry| !entry.is_pre_release())
        .map(|entry| VersionInfo::new(entry.version))
        .ok_or_else(|| RegistryError::NoStableVersion {
            identifier: identifier.clone(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn identifier() -> PackageIdentifier {
        PackageIdentifier::try_from("pub.a").expect("valid identifier")
    }

    fn response_with_versions(versions: &str) -> String {
        format!(r#"{{"results":[{{"extensions":[{{"versions":[{versions}]}}]}}]}}"#)
    }

    fn pre_release(version: &str) -> String {
        format!(
            r#"{{"version":"{version}","properties":[{{"key":"{PRE_RELEASE_PROPERTY}","value":"true"}}]}}"#
        )
    }

    fn stable(version: &str) -> String {
        format!(
            r#"{{"version":"{version}","properties":[{{"key":"Microsoft.VisualStudio.Code.Engine","value":"^1.80.0"}}]}}"#
        )
    }

    #[rstest]
    fn query_body_uses_name_filter_and_flags(identifier: PackageIdentifier) {
        let body = query_body(&identifier).expect("serializable");
        let value: serde_json::Value = serde_json::from_str(&body).expect("valid JSON");
        assert_eq!(value["flags"], QUERY_FLAGS);
        assert_eq!(
            value["filters"][0]["criteria"][0]["filterType"],
            FILTER_TYPE_EXTENSION_NAME
        );
        assert_eq!(value["filters"][0]["criteria"][0]["value"], "pub.a");
    }

    #[test]
    fn query_flags_request_all_versions() {
        assert_ne!(QUERY_FLAGS & flags::INCLUDE_VERSIONS, 0);
        assert_ne!(QUERY_FLAGS & flags::INCLUDE_VERSION_PROPERTIES, 0);
    }

    #[rstest]
    #[case::first_is_stable(vec![stable("2.0.0"), stable("1.0.0")], "2.0.0")]
    #[case::skips_pre_release(vec![pre_release("2.1.0"), stable("2.0.0")], "2.0.0")]
    #[case::keeps_registry_order(
        vec![pre_release("3.0.0"), stable("1.0.0"), stable("2.0.0")],
        "1.0.0"
    )]
    #[case::no_properties(vec![r#"{"version":"0.1.0"}"#.to_owned()], "0.1.0")]
    fn selects_first_stable_version(
        identifier: PackageIdentifier,
        #[case] versions: Vec<String>,
        #[case] expected: &str,
    ) {
        let json = response_with_versions(&versions.join(","));
        let version = parse_latest_stable(&json, &identifier).expect("stable version");
        assert_eq!(version.as_str(), expected);
    }

    #[rstest]
    fn pre_release_value_false_counts_as_stable(identifier: PackageIdentifier) {
        let entry = format!(
            r#"{{"version":"1.0.0","properties":[{{"key":"{PRE_RELEASE_PROPERTY}","value":"false"}}]}}"#
        );
        let json = response_with_versions(&entry);
        let version = parse_latest_stable(&json, &identifier).expect("stable version");
        assert_eq!(version.as_str(), "1.0.0");
    }

    #[rstest]
    fn only_pre_release_versions_is_an_error(identifier: PackageIdentifier) {
        let json = response_with_versions(&pre_release("1.0.0"));
        let result = parse_latest_stable(&json, &identifier);
        assert!(matches!(result, Err(RegistryError::NoStableVersion { .. })));
    }

    #[rstest]
    #[case::no_results(r#"{"results":[]}"#)]
    #[case::no_extensions(r#"{"results":[{"extensions":[]}]}"#)]
    #[case::empty_object("{}")]
    fn missing_extension_is_not_found(identifier: PackageIdentifier, #[case] json: &str) {
        let result = parse_latest_stable(json, &identifier);
        assert!(matches!(result, Err(RegistryError::NotFound { .. })));
    }

    #[rstest]
    fn malformed_json_is_decode_error(identifier: PackageIdentifier) {
        let result = parse_latest_stable("{not json", &identifier);
        assert!(matches!(result, Err(RegistryError::Decode(_))));
    }
}
