//! Query cache: memoized match sets keyed by [`Signature`].
//!
//! Alongside the entries the cache keeps a reverse index from each [`Tid`] to
//! the signatures that mention it, required or excluded. Invalidating a type
//! therefore touches only the affected entries.

use std::collections::{HashMap, HashSet};

use ecdb_component::{Signature, Tid};
use tracing::debug;

use crate::query::MatchSet;

/// Memoized query results.
#[derive(Debug, Default)]
pub struct QueryCache {
    entries: HashMap<Signature, MatchSet>,
    by_type: HashMap<Tid, HashSet<Signature>>,
    hits: u64,
    misses: u64,
    invalidated: u64,
}

impl QueryCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached match set of `signature`, computing and storing it
    /// with `compute` on a miss.
    pub fn get_or_compute(
        &mut self,
        signature: &Signature,
        compute: impl FnOnce() -> MatchSet,
    ) -> &MatchSet {
        use std::collections::hash_map::Entry;

        match self.entries.entry(signature.clone()) {
            Entry::Occupied(entry) => {
                self.hits += 1;
                entry.into_mut()
            }
            Entry::Vacant(entry) => {
                self.misses += 1;
                let matches = compute();
                debug!(%signature, matches = matches.len(), "query cache miss");
                for tid in signature.types() {
                    self.by_type
                        .entry(tid)
                        .or_default()
                        .insert(signature.clone());
                }
                entry.insert(matches)
            }
        }
    }

    /// Drop every entry whose signature mentions `tid`.
    pub fn invalidate_type(&mut self, tid: Tid) {
        let Some(signatures) = self.by_type.remove(&tid) else {
            return;
        };
        for signature in signatures {
            debug_assert!(signature.mentions(tid), "{signature} indexed under {tid}");
            if self.entries.remove(&signature).is_none() {
                continue;
            }
            self.invalidated += 1;
            for other in signature.types().filter(|&other| other != tid) {
                if let Some(set) = self.by_type.get_mut(&other) {
                    set.remove(&signature);
                    if set.is_empty() {
                        self.by_type.remove(&other);
                    }
                }
            }
            debug!(%signature, %tid, "query cache entry invalidated");
        }
    }

    /// Drop every entry whose signature mentions any of `tids`.
    pub fn invalidate_types(&mut self, tids: impl IntoIterator<Item = Tid>) {
        for tid in tids {
            self.invalidate_type(tid);
        }
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        if self.entries.is_empty() {
            return;
        }
        self.invalidated += self.entries.len() as u64;
        debug!(entries = self.entries.len(), "query cache cleared");
        self.entries.clear();
        self.by_type.clear();
    }

    /// Returns the number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the cache holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lookups answered from a live entry.
    #[must_use]
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Lookups that had to scan.
    #[must_use]
    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// Entries dropped by invalidation so far.
    #[must_use]
    pub fn invalidated(&self) -> u64 {
        self.invalidated
    }
}
