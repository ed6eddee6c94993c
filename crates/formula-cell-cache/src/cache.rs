use std::sync::{Arc, Weak};

use crate::base::CacheStats;
use crate::bucket::BucketCache;
use crate::cell::CachedCell;
use crate::error::Result;
use crate::position::{self, CellPosition};
use crate::settings::{CacheMethod, CacheSettings};
#[cfg(feature = "sqlite")]
use crate::sqlite::SqliteCache;

/// Sheet type a cache's cells are bound to.
pub type SheetOf<T> = <<T as CellCache>::Cell as CachedCell>::Sheet;

/// Uniform operations over every cell cache backend.
///
/// Coordinates are opaque keys compared by exact string match. Lookups consult the
/// backend's in-memory staging area first and fall back to persisted storage; cells
/// returned from persisted storage are staged and re-attached to the owning sheet.
///
/// A missing coordinate is never an error: getters return `Ok(None)` and
/// [`CellCache::is_data_set`] returns `Ok(false)`. Storage failures propagate as
/// [`crate::CacheError`]; dirty state is only cleared once a write succeeded.
pub trait CellCache {
    type Cell: CachedCell;

    /// Whether `coord` holds a cell, staged or persisted.
    fn is_data_set(&self, coord: &str) -> Result<bool>;

    /// Insert or replace the cell at `coord`, returning the staged object.
    ///
    /// This may flush previously staged cells to make room.
    fn add_cache_data(&mut self, coord: &str, cell: Self::Cell) -> Result<&mut Self::Cell>;

    /// Cell at `coord`, loading it into the staging area if it was only persisted.
    fn get_cache_data(&mut self, coord: &str) -> Result<Option<&Self::Cell>>;

    /// Like [`CellCache::get_cache_data`], but marks the staged cell dirty so edits made
    /// through the returned reference are persisted on the next flush.
    fn get_cache_data_mut(&mut self, coord: &str) -> Result<Option<&mut Self::Cell>>;

    /// Remove the cell at `coord` and hand it back, detached from its sheet.
    fn take_cache_data(&mut self, coord: &str) -> Result<Option<Self::Cell>>;

    /// Remove `coord` from staging and persisted storage. Deleting an absent coordinate is
    /// a no-op.
    fn delete_cache_data(&mut self, coord: &str) -> Result<()>;

    /// Every cached coordinate, staged or persisted, without duplicates. Order is
    /// unspecified; see [`CellCache::get_sorted_cell_list`].
    fn get_cell_list(&mut self) -> Result<Vec<String>>;

    /// Duplicate all cached data into a new, independent cache bound to `parent`.
    ///
    /// The source keeps its own storage and contents; afterwards the two caches share no
    /// resources.
    fn copy_cell_collection(&mut self, parent: Weak<SheetOf<Self>>) -> Result<Self>
    where
        Self: Sized;

    /// Detach every staged cell, drop all cached data, forget the owning sheet and release
    /// the persisted storage. Any later call other than this one and
    /// [`CellCache::stats`] fails with [`crate::CacheError::TornDown`].
    fn unset_worksheet_cells(&mut self) -> Result<()>;

    /// The owning sheet, if it is still alive and the cache has not been torn down.
    fn parent(&self) -> Option<Arc<SheetOf<Self>>>;

    fn stats(&self) -> CacheStats;

    /// [`CellCache::get_cell_list`] ordered row-major; non-A1 keys last.
    fn get_sorted_cell_list(&mut self) -> Result<Vec<String>> {
        let mut cells = self.get_cell_list()?;
        position::sort_cell_list(&mut cells);
        Ok(cells)
    }

    /// Highest row and highest column used by any A1 coordinate in the cache.
    fn highest_row_and_column(&mut self) -> Result<Option<CellPosition>> {
        let cells = self.get_cell_list()?;
        Ok(position::highest_row_and_column(&cells))
    }

    /// Move the cell at `from` to `to`, replacing whatever was at `to`.
    ///
    /// Does nothing if `from` is empty.
    fn move_cell(&mut self, from: &str, to: &str) -> Result<()> {
        if from == to {
            return self.is_data_set(from).map(|_| ());
        }
        if let Some(cell) = self.take_cache_data(from)? {
            self.add_cache_data(to, cell)?;
        }
        Ok(())
    }
}

/// A cell cache whose backend is chosen from [`CacheSettings`] at construction.
pub enum CellCollection<C: CachedCell> {
    Bucketed(BucketCache<C>),
    #[cfg(feature = "sqlite")]
    Sqlite(SqliteCache<C>),
}

macro_rules! dispatch {
    ($self:expr, $cache:ident => $body:expr) => {
        match $self {
            CellCollection::Bucketed($cache) => $body,
            #[cfg(feature = "sqlite")]
            CellCollection::Sqlite($cache) => $body,
        }
    };
}

impl<C: CachedCell> CellCollection<C> {
    /// Build the backend named by `settings.method`.
    ///
    /// Returns [`crate::CacheError::Unavailable`] if that backend's engine is not part of this
    /// build; check [`CacheMethod::is_available`] first to pick a fallback.
    pub fn new(parent: Weak<C::Sheet>, settings: &CacheSettings) -> Result<Self> {
        match settings.method {
            CacheMethod::Bucketed => Ok(CellCollection::Bucketed(BucketCache::new(
                parent,
                settings.bucket_max_size,
                settings.memory_cache_size,
            ))),
            #[cfg(feature = "sqlite")]
            CacheMethod::Sqlite => Ok(CellCollection::Sqlite(SqliteCache::new(parent)?)),
            #[cfg(not(feature = "sqlite"))]
            CacheMethod::Sqlite => Err(crate::CacheError::Unavailable(CacheMethod::Sqlite)),
        }
    }

    pub fn method(&self) -> CacheMethod {
        match self {
            CellCollection::Bucketed(_) => CacheMethod::Bucketed,
            #[cfg(feature = "sqlite")]
            CellCollection::Sqlite(_) => CacheMethod::Sqlite,
        }
    }
}

impl<C: CachedCell> CellCache for CellCollection<C> {
    type Cell = C;

    fn is_data_set(&self, coord: &str) -> Result<bool> {
        dispatch!(self, cache => cache.is_data_set(coord))
    }

    fn add_cache_data(&mut self, coord: &str, cell: C) -> Result<&mut C> {
        dispatch!(self, cache => cache.add_cache_data(coord, cell))
    }

    fn get_cache_data(&mut self, coord: &str) -> Result<Option<&C>> {
        dispatch!(self, cache => cache.get_cache_data(coord))
    }

    fn get_cache_data_mut(&mut self, coord: &str) -> Result<Option<&mut C>> {
        dispatch!(self, cache => cache.get_cache_data_mut(coord))
    }

    fn take_cache_data(&mut self, coord: &str) -> Result<Option<C>> {
        dispatch!(self, cache => cache.take_cache_data(coord))
    }

    fn delete_cache_data(&mut self, coord: &str) -> Result<()> {
        dispatch!(self, cache => cache.delete_cache_data(coord))
    }

    fn get_cell_list(&mut self) -> Result<Vec<String>> {
        dispatch!(self, cache => cache.get_cell_list())
    }

    fn copy_cell_collection(&mut self, parent: Weak<C::Sheet>) -> Result<Self> {
        Ok(match self {
            CellCollection::Bucketed(cache) => {
                CellCollection::Bucketed(cache.copy_cell_collection(parent)?)
            }
            #[cfg(feature = "sqlite")]
            CellCollection::Sqlite(cache) => {
                CellCollection::Sqlite(cache.copy_cell_collection(parent)?)
            }
        })
    }

    fn unset_worksheet_cells(&mut self) -> Result<()> {
        dispatch!(self, cache => cache.unset_worksheet_cells())
    }

    fn parent(&self) -> Option<Arc<C::Sheet>> {
        dispatch!(self, cache => cache.parent())
    }

    fn stats(&self) -> CacheStats {
        dispatch!(self, cache => cache.stats())
    }
}
