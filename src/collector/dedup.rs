//! Run-scoped content deduplication

use std::collections::HashSet;

use crate::Fingerprint;

/// Set of fingerprints seen during one collection run
///
/// Only grows; shared by every query of the run.
#[derive(Debug, Default, Clone)]
pub struct Deduplicator {
    seen: HashSet<Fingerprint>,
}

impl Deduplicator {
    /// Empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `fingerprint` was already seen
    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.seen.contains(fingerprint)
    }

    /// Insert `fingerprint`
    pub fn add(&mut self, fingerprint: Fingerprint) {
        self.seen.insert(fingerprint);
    }

    /// Insert `fingerprint`, returning `true` only if it was absent
    pub fn check_and_add(&mut self, fingerprint: &Fingerprint) -> bool {
        if self.seen.contains(fingerprint) {
            return false;
        }
        self.seen.insert(fingerprint.clone())
    }

    /// Number of distinct fingerprints seen
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Whether nothing has been seen yet
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
