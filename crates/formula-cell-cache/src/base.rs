//! Bookkeeping shared by every backend.

use std::sync::{Arc, Weak};

use crate::cell::CachedCell;

/// Cumulative counters for one cache instance.
///
/// This is intended for observability (e.g. telemetry, debug overlays) and tests.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the staging area.
    pub hits: u64,
    /// Lookups that had to go to persisted storage.
    pub misses: u64,
    /// Persisted writes: one per bucket unit or per upserted row.
    pub flushes: u64,
    /// Units/rows read back from persisted storage.
    pub loads: u64,
    /// Cells contained in all persisted writes.
    pub cells_written: u64,
}

/// Owning-sheet link plus counters. Backends embed one of these.
pub(crate) struct CacheBase<S> {
    parent: Option<Weak<S>>,
    pub(crate) stats: CacheStats,
}

impl<S> CacheBase<S> {
    pub(crate) fn new(parent: Weak<S>) -> Self {
        Self {
            parent: Some(parent),
            stats: CacheStats::default(),
        }
    }

    pub(crate) fn parent(&self) -> Option<Arc<S>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    pub(crate) fn attach<C>(&self, cell: &mut C)
    where
        C: CachedCell<Sheet = S>,
    {
        if let Some(parent) = &self.parent {
            cell.attach(parent.clone());
        }
    }

    pub(crate) fn attach_all<'a, C>(&self, cells: impl IntoIterator<Item = &'a mut C>)
    where
        C: CachedCell<Sheet = S> + 'a,
    {
        for cell in cells {
            self.attach(cell);
        }
    }

    /// Forget the owning sheet so it can be dropped independently of the cache.
    pub(crate) fn release_parent(&mut self) {
        self.parent = None;
    }

    pub(crate) fn record_lookup(&mut self, hit: bool) {
        if hit {
            self.stats.hits = self.stats.hits.saturating_add(1);
        } else {
            self.stats.misses = self.stats.misses.saturating_add(1);
        }
    }

    pub(crate) fn record_flush(&mut self, cells: usize) {
        self.stats.flushes = self.stats.flushes.saturating_add(1);
        self.stats.cells_written = self.stats.cells_written.saturating_add(cells as u64);
    }

    pub(crate) fn record_load(&mut self) {
        self.stats.loads = self.stats.loads.saturating_add(1);
    }
}
