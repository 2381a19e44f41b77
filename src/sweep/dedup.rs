//! Identity-key deduplication.

use hashbrown::HashSet;

use crate::models::IdentityKey;

#[derive(Debug, Default)]
pub struct DedupSet {
    seen: HashSet<IdentityKey>,
    duplicates: u64,
}

impl DedupSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a key. Returns `false` and counts a duplicate if it was already seen.
    pub fn insert(&mut self, key: IdentityKey) -> bool {
        if self.seen.insert(key) {
            true
        } else {
            self.duplicates += 1;
            false
        }
    }

    /// Forget seen keys (new cell under per-cell scope); the duplicate count is kept
    pub fn clear(&mut self) {
        self.seen.clear();
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn duplicates(&self) -> u64 {
        self.duplicates
    }
}
