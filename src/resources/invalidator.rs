//! Change tracking for derived data.

use crate::hir::{DefIndex, LookupCache};

/// Dirty flag, change serial and the lookup cache they guard.
///
/// Many invalidations between two reads collapse into a single rehash.
#[derive(Debug)]
pub(crate) struct Invalidator {
    change_serial: u64,
    dirty: bool,
    rehash_count: u64,
    pub cache: LookupCache,
}

impl Default for Invalidator {
    fn default() -> Self {
        Self {
            change_serial: 1,
            dirty: true,
            rehash_count: 0,
            cache: LookupCache::new(),
        }
    }
}

impl Invalidator {
    /// Mark every derived datum stale.
    pub fn invalidate(&mut self, index: &DefIndex) {
        self.change_serial += 1;
        self.dirty = true;
        self.cache.clear();
        index.invalidate_inherited();
    }

    pub fn needs_rehash(&self) -> bool {
        self.dirty
    }

    pub fn mark_rehashed(&mut self) {
        self.dirty = false;
        self.rehash_count += 1;
    }

    pub fn change_serial(&self) -> u64 {
        self.change_serial
    }

    pub fn rehash_count(&self) -> u64 {
        self.rehash_count
    }
}
