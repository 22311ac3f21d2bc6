//! Package identifier newtype and user-input parsing.
//!
//! Marketplace packages are addressed as `publisher.name`. The Marketplace
//! and the `code` CLI compare identifiers case-insensitively, so
//! [`PackageIdentifier`] stores the lowercase form and all equality checks
//! are exact on that form.

use std::fmt;
use thiserror::Error;
use url::Url;

/// Query parameter carrying the identifier in Marketplace item URLs.
const ITEM_NAME_PARAM: &str = "itemName";

/// Errors arising from malformed package identifiers or inputs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    /// The input was empty after trimming.
    #[error("package identifier must not be empty")]
    Empty,

    /// The identifier does not match `publisher.name`.
    #[error("invalid package identifier \"{value}\": {reason}; expected publisher.name")]
    Malformed {
        /// The rejected identifier.
        value: String,
        /// Description of the violated constraint.
        reason: &'static str,
    },

    /// A Marketplace URL was given without an `itemName` query parameter.
    #[error("URL {url} has no itemName query parameter")]
    MissingItemName {
        /// The URL as entered.
        url: String,
    },
}

/// A validated `publisher.name` package identifier.
///
/// # Examples
///
/// ```
/// use vsix_installer::identifier::PackageIdentifier;
///
/// let id: PackageIdentifier = "MS-Python.python".try_into().unwrap();
/// assert_eq!(id.as_str(), "ms-python.python");
/// assert_eq!(id.publisher(), "ms-python");
/// assert_eq!(id.name(), "python");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageIdentifier(String);

impl PackageIdentifier {
    /// Return the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Return the publisher segment (everything before the first `.`).
    #[must_use]
    pub fn publisher(&self) -> &str {
        self.split().0
    }

    /// Return the name segment (everything after the first `.`).
    #[must_use]
    pub fn name(&self) -> &str {
        self.split().1
    }

    /// Consume the wrapper and return the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    fn split(&self) -> (&str, &str) {
        // Validated on construction, so the separator is always present.
        self.0.split_once('.').unwrap_or((self.0.as_str(), ""))
    }
}

impl TryFrom<&str> for PackageIdentifier {
    type Error = IdentifierError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        validate_identifier(value)?;
        Ok(Self(value.to_ascii_lowercase()))
    }
}

impl TryFrom<String> for PackageIdentifier {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl AsRef<str> for PackageIdentifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PackageIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parse user input into a [`PackageIdentifier`].
///
/// Accepts either a bare `publisher.name` identifier or a Marketplace item
/// URL such as `https://marketplace.visualstudio.com/items?itemName=pub.name`.
///
/// # Errors
///
/// Returns [`IdentifierError::Empty`] for blank input,
/// [`IdentifierError::MissingItemName`] for an http(s) URL without an
/// `itemName` parameter, and [`IdentifierError::Malformed`] when the
/// resulting identifier is not `publisher.name`.
///
/// # Examples
///
/// ```
/// use vsix_installer::identifier::parse_input;
///
/// let id = parse_input("https://marketplace.visualstudio.com/items?itemName=pub.a").unwrap();
/// assert_eq!(id.as_str(), "pub.a");
/// assert!(parse_input("nodotsatall").is_err());
/// ```
pub fn parse_input(input: &str) -> Result<PackageIdentifier, IdentifierError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(IdentifierError::Empty);
    }

    match Url::parse(trimmed) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {
            let item_name = url
                .query_pairs()
                .find(|(key, _)| key == ITEM_NAME_PARAM)
                .map(|(_, value)| value.into_owned())
                .ok_or_else(|| IdentifierError::MissingItemName {
                    url: trimmed.to_owned(),
                })?;
            PackageIdentifier::try_from(item_name)
        }
        _ => PackageIdentifier::try_from(trimmed),
    }
}

/// Characters that would change the meaning of a registry URL path.
const URL_RESERVED: [char; 4] = ['/', '?', '#', '%'];

fn validate_identifier(value: &str) -> Result<(), IdentifierError> {
    if value.is_empty() {
        return Err(IdentifierError::Empty);
    }
    let malformed = |reason| IdentifierError::Malformed {
        value: value.to_owned(),
        reason,
    };
    let Some((publisher, name)) = value.split_once('.') else {
        return Err(malformed("missing '.' separator"));
    };
    if publisher.is_empty() {
        return Err(malformed("publisher must not be empty"));
    }
    if name.is_empty() {
        return Err(malformed("name must not be empty"));
    }
    if value.chars().any(|c| c.is_whitespace() || URL_RESERVED.contains(&c)) {
        return Err(malformed("whitespace and URL delimiters are not allowed"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn accepts_publisher_and_name() {
        let id = PackageIdentifier::try_from("pub.a").expect("valid identifier");
        assert_eq!(id.publisher(), "pub");
        assert_eq!(id.name(), "a");
    }

    #[test]
    fn normalises_to_lowercase() {
        let id = PackageIdentifier::try_from("GitHub.Copilot").expect("valid identifier");
        assert_eq!(id.as_str(), "github.copilot");
        assert_eq!(id, PackageIdentifier::try_from("github.copilot").expect("valid"));
    }

    #[test]
    fn name_keeps_everything_after_first_separator() {
        let id = PackageIdentifier::try_from("pub.some.name").expect("valid identifier");
        assert_eq!(id.publisher(), "pub");
        assert_eq!(id.name(), "some.name");
    }

    #[rstest]
    #[case::no_separator("nodotsatall")]
    #[case::empty_publisher(".name")]
    #[case::empty_name("publisher.")]
    #[case::only_separator(".")]
    #[case::whitespace("pub. name")]
    #[case::slash("pub/x.name")]
    #[case::query("pub.a?x")]
    #[case::fragment("pub.a#x")]
    #[case::percent("pub.a%2fx")]
    fn rejects_malformed_identifiers(#[case] value: &str) {
        let result = PackageIdentifier::try_from(value);
        assert!(
            matches!(result, Err(IdentifierError::Malformed { .. })),
            "expected Malformed for {value}, got {result:?}"
        );
    }

    #[rstest]
    #[case::bare("pub.a", "pub.a")]
    #[case::padded("  pub.a\n", "pub.a")]
    #[case::marketplace_url(
        "https://marketplace.visualstudio.com/items?itemName=ms-python.python",
        "ms-python.python"
    )]
    #[case::url_with_extra_params(
        "https://marketplace.visualstudio.com/items?ssr=false&itemName=Pub.A#overview",
        "pub.a"
    )]
    fn parse_input_extracts_identifier(#[case] input: &str, #[case] expected: &str) {
        let id = parse_input(input).expect("input should parse");
        assert_eq!(id.as_str(), expected);
    }

    #[rstest]
    #[case::blank("   ")]
    #[case::empty("")]
    fn parse_input_rejects_empty(#[case] input: &str) {
        assert_eq!(parse_input(input), Err(IdentifierError::Empty));
    }

    #[test]
    fn parse_input_rejects_url_without_item_name() {
        let result = parse_input("https://marketplace.visualstudio.com/items?foo=bar");
        assert!(matches!(result, Err(IdentifierError::MissingItemName { .. })));
    }

    #[test]
    fn parse_input_rejects_url_with_malformed_item_name() {
        let result = parse_input("https://marketplace.visualstudio.com/items?itemName=broken");
        assert!(matches!(result, Err(IdentifierError::Malformed { .. })));
    }

    #[test]
    fn display_shows_normalised_value() {
        let id = PackageIdentifier::try_from("Pub.A").expect("valid identifier");
        assert_eq!(format!("{id}"), "pub.a");
    }
}
