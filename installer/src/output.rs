//! Output formatting for the installer CLI.
//!
//! Progress lines, results and errors are all written to stderr.

use crate::identifier::PackageIdentifier;
use crate::pipeline::{InstallOutcome, InstallPlan};
use std::io::Write;

/// Write `message` followed by a newline, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort logging; ignore write failures.
    }
}

/// Format a success message after installation.
///
/// # Example
///
/// ```
/// use vsix_installer::identifier::PackageIdentifier;
/// use vsix_installer::output::success_message;
///
/// let root = PackageIdentifier::try_from("pub.a").unwrap();
/// assert_eq!(success_message(&root, 2), "Installed pub.a (2 packages)");
/// ```
#[must_use]
pub fn success_message(root: &PackageIdentifier, count: usize) -> String {
    let plural = if count == 1 { "package" } else { "packages" };
    format!("Installed {root} ({count} {plural})")
}

/// Summarise a completed install.
#[must_use]
pub fn outcome_text(outcome: &InstallOutcome) -> String {
    let mut text = success_message(&outcome.root, outcome.installed.len());
    if outcome.installed.len() > 1 {
        text.push_str("\n\nInstall order:\n");
        push_numbered(&mut text, &outcome.installed);
    }
    text
}

/// Render a resolve-only plan.
///
/// # Example
///
/// ```
/// use vsix_installer::identifier::PackageIdentifier;
/// use vsix_installer::output::plan_text;
/// use vsix_installer::pipeline::InstallPlan;
///
/// let id = |s: &str| PackageIdentifier::try_from(s).unwrap();
/// let plan = InstallPlan {
///     root: id("pub.a"),
///     discovery_order: vec![id("pub.a"), id("pub.b")],
///     install_order: vec![id("pub.b"), id("pub.a")],
///     warnings: Vec::new(),
/// };
/// let text = plan_text(&plan);
/// assert!(text.contains("  1. pub.b"));
/// ```
#[must_use]
pub fn plan_text(plan: &InstallPlan) -> String {
    let mut text = format!("Resolved {}\n\nDiscovery order:\n", plan.root);
    push_numbered(&mut text, &plan.discovery_order);
    text.push_str("\nInstall order:\n");
    push_numbered(&mut text, &plan.install_order);
    if !plan.warnings.is_empty() {
        text.push_str("\nWarnings:\n");
        for warning in &plan.warnings {
            text.push_str(&format!("  - {warning}\n"));
        }
    }
    text.trim_end().to_owned()
}

fn push_numbered(text: &mut String, identifiers: &[PackageIdentifier]) {
    if identifiers.is_empty() {
        text.push_str("  (none)\n");
    }
    for (index, identifier) in identifiers.iter().enumerate() {
        text.push_str(&format!("  {}. {identifier}\n", index + 1));
    }
}
