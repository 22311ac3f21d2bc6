//! Request-scoped work list of artifacts awaiting installation.
//!
//! A [`WorkList`] is an insertion-ordered set keyed by package identifier.
//! Each entry carries a sequence number; repositioning an entry gives it a
//! fresh number past every other entry, which moves it to the tail without
//! disturbing the relative order of the rest. Dependency edges observed
//! during resolution are kept alongside so the install order can be derived
//! either from discovery order alone or from the recorded graph.

use crate::artifact::ArtifactHandle;
use crate::identifier::PackageIdentifier;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

/// Strategy used to derive the install order from a [`WorkList`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum InstallOrder {
    /// Drain the list tail-to-head (reverse discovery order).
    Discovery,
    /// Order by the recorded dependency edges, falling back to reverse
    /// discovery order between independent artifacts.
    #[default]
    Topological,
}

impl fmt::Display for InstallOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Discovery => f.write_str("discovery"),
            Self::Topological => f.write_str("topological"),
        }
    }
}

/// Ordered, duplicate-free list of downloaded artifacts.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use vsix_installer::artifact::ArtifactHandle;
/// use vsix_installer::identifier::PackageIdentifier;
/// use vsix_installer::registry::VersionInfo;
/// use vsix_installer::worklist::WorkList;
///
/// let handle = |id: &str| {
///     let id = PackageIdentifier::try_from(id).unwrap();
///     ArtifactHandle::in_dir(Utf8Path::new("/tmp"), id, VersionInfo::new("1.0.0"))
/// };
/// let mut list = WorkList::new();
/// list.push(handle("pub.a"));
/// list.push(handle("pub.b"));
/// assert!(list.reposition_to_tail(&PackageIdentifier::try_from("pub.a").unwrap()));
///
/// let order: Vec<_> = list.identifiers().iter().map(|id| id.to_string()).collect();
/// assert_eq!(order, ["pub.b", "pub.a"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct WorkList {
    entries: BTreeMap<u64, ArtifactHandle>,
    positions: HashMap<PackageIdentifier, u64>,
    dependencies: BTreeMap<PackageIdentifier, Vec<PackageIdentifier>>,
    next_seq: u64,
}

impl WorkList {
    /// Create an empty work list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the number of queued artifacts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return `true` if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return `true` if `identifier` is queued.
    #[must_use]
    pub fn contains(&self, identifier: &PackageIdentifier) -> bool {
        self.positions.contains_key(identifier)
    }

    /// Return the zero-based position of `identifier` in discovery order.
    #[must_use]
    pub fn position(&self, identifier: &PackageIdentifier) -> Option<usize> {
        let seq = self.positions.get(identifier)?;
        Some(self.entries.range(..*seq).count())
    }

    /// Return the queued artifact for `identifier`.
    #[must_use]
    pub fn get(&self, identifier: &PackageIdentifier) -> Option<&ArtifactHandle> {
        self.positions
            .get(identifier)
            .and_then(|seq| self.entries.get(seq))
    }

    /// Append `handle` at the tail.
    ///
    /// An existing entry for the same identifier is removed first and
    /// returned, so the list never holds an identifier twice.
    pub fn push(&mut self, handle: ArtifactHandle) -> Option<ArtifactHandle> {
        let displaced = self.remove_entry(handle.identifier());
        let seq = self.take_seq();
        self.positions.insert(handle.identifier().clone(), seq);
        self.entries.insert(seq, handle);
        displaced
    }

    /// Move the entry for `identifier` to the tail.
    ///
    /// Returns `false`, leaving the list unchanged, if `identifier` is not
    /// queued.
    pub fn reposition_to_tail(&mut self, identifier: &PackageIdentifier) -> bool {
        let Some(handle) = self.remove_entry(identifier) else {
            return false;
        };
        self.push(handle);
        true
    }

    /// Record that `dependent` declares a direct dependency on `dependency`.
    ///
    /// Self-dependencies and repeated edges are ignored.
    pub fn record_dependency(&mut self, dependent: &PackageIdentifier, dependency: &PackageIdentifier) {
        if dependent == dependency {
            return;
        }
        let declared = self.dependencies.entry(dependent.clone()).or_default();
        if !declared.contains(dependency) {
            declared.push(dependency.clone());
        }
    }

    /// Return the recorded direct dependencies of `dependent`.
    #[must_use]
    pub fn dependencies_of(&self, dependent: &PackageIdentifier) -> &[PackageIdentifier] {
        self.dependencies
            .get(dependent)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Iterate over queued artifacts in discovery order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &ArtifactHandle> {
        self.entries.values()
    }

    /// Return the queued identifiers in discovery order.
    #[must_use]
    pub fn identifiers(&self) -> Vec<PackageIdentifier> {
        self.iter().map(|handle| handle.identifier().clone()).collect()
    }

    /// Return the artifacts in the order they should be installed.
    #[must_use]
    pub fn install_order(&self, order: InstallOrder) -> Vec<&ArtifactHandle> {
        match order {
            InstallOrder::Discovery => self.iter().rev().collect(),
            InstallOrder::Topological => self.topological_order(),
        }
    }

    /// Remove every entry and recorded edge.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.positions.clear();
        self.dependencies.clear();
    }

    fn take_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    fn remove_entry(&mut self, identifier: &PackageIdentifier) -> Option<ArtifactHandle> {
        let seq = self.positions.remove(identifier)?;
        self.entries.remove(&seq)
    }

    /// Kahn's algorithm over the recorded edges restricted to queued
    /// artifacts. Among ready artifacts the one latest in discovery order
    /// goes first; a cycle is broken at its latest remaining member.
    fn topological_order(&self) -> Vec<&ArtifactHandle> {
        let mut pending: HashMap<u64, usize> = HashMap::new();
        let mut dependents: HashMap<u64, Vec<u64>> = HashMap::new();

        for (&seq, handle) in &self.entries {
            let mut unmet = BTreeSet::new();
            for dependency in self.dependencies_of(handle.identifier()) {
                if let Some(&dep_seq) = self.positions.get(dependency) {
                    unmet.insert(dep_seq);
                }
            }
            for &dep_seq in &unmet {
                dependents.entry(dep_seq).or_default().push(seq);
            }
            pending.insert(seq, unmet.len());
        }

        let mut remaining: BTreeSet<u64> = self.entries.keys().copied().collect();
        let mut ready: BTreeSet<u64> = pending
            .iter()
            .filter(|&(_, &count)| count == 0)
            .map(|(&seq, _)| seq)
            .collect();
        let mut ordered = Vec::with_capacity(self.entries.len());

        while let Some(&latest_remaining) = remaining.last() {
            let seq = ready
                .pop_last()
                .unwrap_or_else(|| self.break_cycle(latest_remaining));
            remaining.remove(&seq);
            if let Some(handle) = self.entries.get(&seq) {
                ordered.push(handle);
            }

            for dependent in dependents.get(&seq).into_iter().flatten() {
                if let Some(count) = pending.get_mut(dependent) {
                    *count = count.saturating_sub(1);
                    if *count == 0 && remaining.contains(dependent) {
                        ready.insert(*dependent);
                    }
                }
            }
        }

        ordered
    }

    fn break_cycle(&self, seq: u64) -> u64 {
        if let Some(handle) = self.entries.get(&seq) {
            log::warn!(
                "dependency cycle involving {}; installing it before its dependencies",
                handle.identifier()
            );
        }
        seq
    }
}
