//! Bucketed stream backend.
//!
//! Cells are staged in a bounded bucket. When a new coordinate arrives at a full bucket,
//! or before any persisted unit is read back, the whole bucket is serialized as one unit
//! and appended to a spooled temp stream (in memory up to `memory_cache_size`, then an
//! anonymous temp file). Every coordinate in that unit gets the same [`IndexEntry`], so
//! reading one coordinate back reloads its whole unit as the new bucket.
//!
//! The stream is append-only: superseded and deleted units become dead space and are never
//! compacted.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::{Arc, Weak};

use serde::Serialize;
use tempfile::SpooledTempFile;

use crate::base::{CacheBase, CacheStats};
use crate::cache::CellCache;
use crate::cell::CachedCell;
use crate::codec;
use crate::error::{CacheError, Result};

const COPY_CHUNK_BYTES: usize = 1024;

/// Location of a persisted unit inside the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndexEntry {
    pub offset: u64,
    pub length: u32,
}

pub struct BucketCache<C: CachedCell> {
    base: CacheBase<C::Sheet>,
    /// Every cached coordinate. `None` until the bucket holding it is first flushed.
    index: HashMap<String, Option<IndexEntry>>,
    bucket: HashMap<String, C>,
    /// Set whenever the bucket differs from what the stream holds.
    bucket_changed: bool,
    bucket_max_size: usize,
    memory_cache_size: usize,
    /// `None` once the cache has been torn down.
    stream: Option<SpooledTempFile>,
}

impl<C: CachedCell> BucketCache<C> {
    pub fn new(parent: Weak<C::Sheet>, bucket_max_size: usize, memory_cache_size: usize) -> Self {
        Self {
            base: CacheBase::new(parent),
            index: HashMap::new(),
            bucket: HashMap::new(),
            bucket_changed: false,
            bucket_max_size: bucket_max_size.max(1),
            memory_cache_size,
            stream: Some(SpooledTempFile::new(memory_cache_size)),
        }
    }

    /// Number of cells currently staged in memory.
    pub fn staged_len(&self) -> usize {
        self.bucket.len()
    }

    /// Whether `coord` is in the in-memory bucket (as opposed to only persisted).
    pub fn is_staged(&self, coord: &str) -> bool {
        self.bucket.contains_key(coord)
    }

    /// Persisted location of `coord`, if its bucket has been flushed since it was added.
    pub fn index_entry(&self, coord: &str) -> Option<IndexEntry> {
        self.index.get(coord).copied().flatten()
    }

    fn ensure_live(&self) -> Result<()> {
        if self.stream.is_none() {
            return Err(CacheError::TornDown);
        }
        Ok(())
    }

    /// Append the bucket to the stream if it is dirty.
    fn store_data(&mut self) -> Result<()> {
        if !self.bucket_changed {
            return Ok(());
        }
        if self.bucket.is_empty() {
            self.bucket_changed = false;
            return Ok(());
        }
        let stream = self.stream.as_mut().ok_or(CacheError::TornDown)?;

        for cell in self.bucket.values_mut() {
            cell.detach();
        }
        let written = append_unit(stream, &self.bucket);
        // Staged cells stay live until the bucket is replaced.
        self.base.attach_all(self.bucket.values_mut());
        let entry = written?;

        for coord in self.bucket.keys() {
            self.index.insert(coord.clone(), Some(entry));
        }
        self.bucket_changed = false;
        self.base.record_flush(self.bucket.len());
        log::debug!(
            "flushed bucket of {} cells ({} bytes at offset {})",
            self.bucket.len(),
            entry.length,
            entry.offset
        );
        Ok(())
    }

    /// Ensure `coord` is in the bucket, loading its unit from the stream if needed.
    /// Returns `false` if the coordinate is not cached.
    fn stage(&mut self, coord: &str) -> Result<bool> {
        self.ensure_live()?;
        if self.bucket.contains_key(coord) {
            self.base.record_lookup(true);
            log::trace!("bucket hit for {coord}");
            return Ok(true);
        }
        self.base.record_lookup(false);

        // The current bucket is about to be replaced.
        self.store_data()?;

        let Some(entry) = self.index_entry(coord) else {
            return Ok(false);
        };
        self.load_unit(entry)?;
        if !self.bucket.contains_key(coord) {
            log::warn!(
                "unit at offset {} does not contain indexed cell {coord}",
                entry.offset
            );
            return Ok(false);
        }
        Ok(true)
    }

    /// Replace the bucket with the unit stored at `entry`.
    fn load_unit(&mut self, entry: IndexEntry) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(CacheError::TornDown)?;
        let bytes = read_unit(stream, entry)?;
        let mut unit: HashMap<String, C> = codec::decode(&bytes)?;

        // Cells deleted or re-flushed elsewhere since this unit was written must not come back.
        let index = &self.index;
        unit.retain(|coord, _| index.get(coord).copied().flatten() == Some(entry));
        self.base.attach_all(unit.values_mut());

        log::debug!(
            "loaded unit of {} cells from offset {}",
            unit.len(),
            entry.offset
        );
        self.bucket = unit;
        self.bucket_changed = false;
        self.base.record_load();
        Ok(())
    }
}

impl<C: CachedCell> CellCache for BucketCache<C> {
    type Cell = C;

    fn is_data_set(&self, coord: &str) -> Result<bool> {
        self.ensure_live()?;
        Ok(self.bucket.contains_key(coord) || self.index.contains_key(coord))
    }

    fn add_cache_data(&mut self, coord: &str, mut cell: C) -> Result<&mut C> {
        self.ensure_live()?;
        if !self.bucket.contains_key(coord) && self.bucket.len() >= self.bucket_max_size {
            self.store_data()?;
            self.bucket.clear();
        }

        self.base.attach(&mut cell);
        self.index.entry(coord.to_string()).or_insert(None);
        self.bucket_changed = true;
        let staged = match self.bucket.entry(coord.to_string()) {
            Entry::Occupied(mut slot) => {
                slot.insert(cell).detach();
                slot.into_mut()
            }
            Entry::Vacant(slot) => slot.insert(cell),
        };
        Ok(staged)
    }

    fn get_cache_data(&mut self, coord: &str) -> Result<Option<&C>> {
        if !self.stage(coord)? {
            return Ok(None);
        }
        Ok(self.bucket.get(coord))
    }

    fn get_cache_data_mut(&mut self, coord: &str) -> Result<Option<&mut C>> {
        if !self.stage(coord)? {
            return Ok(None);
        }
        self.bucket_changed = true;
        Ok(self.bucket.get_mut(coord))
    }

    fn take_cache_data(&mut self, coord: &str) -> Result<Option<C>> {
        if !self.stage(coord)? {
            return Ok(None);
        }
        self.index.remove(coord);
        let mut cell = self.bucket.remove(coord);
        if let Some(cell) = cell.as_mut() {
            cell.detach();
        }
        Ok(cell)
    }

    fn delete_cache_data(&mut self, coord: &str) -> Result<()> {
        self.ensure_live()?;
        if let Some(mut cell) = self.bucket.remove(coord) {
            cell.detach();
        }
        self.index.remove(coord);
        Ok(())
    }

    fn get_cell_list(&mut self) -> Result<Vec<String>> {
        self.ensure_live()?;
        Ok(self.index.keys().cloned().collect())
    }

    fn copy_cell_collection(&mut self, parent: Weak<C::Sheet>) -> Result<Self> {
        // Flush first so the copied stream holds every cell; the clone starts with an
        // empty bucket and reads everything back from its own stream.
        self.store_data()?;
        let source = self.stream.as_mut().ok_or(CacheError::TornDown)?;
        let mut stream = SpooledTempFile::new(self.memory_cache_size);
        let copied = copy_stream(source, &mut stream)?;
        log::debug!(
            "copied {copied} byte cell stream for {} cells",
            self.index.len()
        );

        Ok(Self {
            base: CacheBase::new(parent),
            index: self.index.clone(),
            bucket: HashMap::new(),
            bucket_changed: false,
            bucket_max_size: self.bucket_max_size,
            memory_cache_size: self.memory_cache_size,
            stream: Some(stream),
        })
    }

    fn unset_worksheet_cells(&mut self) -> Result<()> {
        for cell in self.bucket.values_mut() {
            cell.detach();
        }
        self.bucket.clear();
        self.index.clear();
        self.bucket_changed = false;
        self.base.release_parent();
        if self.stream.take().is_some() {
            log::debug!("released bucketed cell stream");
        }
        Ok(())
    }

    fn parent(&self) -> Option<Arc<C::Sheet>> {
        self.base.parent()
    }

    fn stats(&self) -> CacheStats {
        self.base.stats
    }
}

fn append_unit<C: Serialize>(
    stream: &mut SpooledTempFile,
    bucket: &HashMap<String, C>,
) -> Result<IndexEntry> {
    let payload = codec::encode(bucket)?;
    let length =
        u32::try_from(payload.len()).map_err(|_| CacheError::UnitTooLarge(payload.len()))?;
    let offset = stream.seek(SeekFrom::End(0))?;
    stream.write_all(&payload)?;
    Ok(IndexEntry { offset, length })
}

fn read_unit(stream: &mut SpooledTempFile, entry: IndexEntry) -> io::Result<Vec<u8>> {
    stream.seek(SeekFrom::Start(entry.offset))?;
    let mut bytes = vec![0u8; entry.length as usize];
    stream.read_exact(&mut bytes)?;
    Ok(bytes)
}

fn copy_stream(source: &mut SpooledTempFile, dest: &mut SpooledTempFile) -> io::Result<u64> {
    source.seek(SeekFrom::Start(0))?;
    let mut chunk = [0u8; COPY_CHUNK_BYTES];
    let mut copied = 0u64;
    loop {
        let n = match source.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };
        dest.write_all(&chunk[..n])?;
        copied += n as u64;
    }
    Ok(copied)
}
