//! SQLite write-through backend.
//!
//! At most one cell is staged in memory. Touching a different coordinate writes the staged
//! cell (if dirty) into a per-cache table in a private in-memory SQLite database, keyed by
//! coordinate. Row presence is the index.

use std::sync::{Arc, Weak};

use rusqlite::{params, Connection, OptionalExtension};

use crate::base::{CacheBase, CacheStats};
use crate::cache::CellCache;
use crate::cell::CachedCell;
use crate::codec;
use crate::error::{CacheError, Result};
use crate::id;

struct CurrentCell<C> {
    coord: String,
    cell: C,
    dirty: bool,
}

pub struct SqliteCache<C: CachedCell> {
    base: CacheBase<C::Sheet>,
    /// Generated by [`id::table_name`]; never caller-controlled.
    table_name: String,
    /// `None` once the cache has been torn down.
    conn: Option<Connection>,
    current: Option<CurrentCell<C>>,
}

impl<C: CachedCell> SqliteCache<C> {
    pub fn new(parent: Weak<C::Sheet>) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let table_name = id::table_name();
        create_table(&conn, &table_name)?;
        log::debug!("created sqlite cell table {table_name}");
        Ok(Self {
            base: CacheBase::new(parent),
            table_name,
            conn: Some(conn),
            current: None,
        })
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Coordinate of the staged cell, if any.
    pub fn current_coordinate(&self) -> Option<&str> {
        self.current.as_ref().map(|current| current.coord.as_str())
    }

    fn connection(&self) -> Result<&Connection> {
        self.conn.as_ref().ok_or(CacheError::TornDown)
    }

    fn is_current(&self, coord: &str) -> bool {
        self.current
            .as_ref()
            .is_some_and(|current| current.coord == coord)
    }

    /// Write the staged cell if it is dirty, then empty the slot.
    fn store_data(&mut self) -> Result<()> {
        let Some(mut current) = self.current.take() else {
            return Ok(());
        };
        if !current.dirty {
            return Ok(());
        }

        current.cell.detach();
        if let Err(err) = self.write_row(&current.coord, &current.cell) {
            // Keep the cell staged and dirty so a later flush can retry.
            self.base.attach(&mut current.cell);
            self.current = Some(current);
            return Err(err);
        }
        self.base.record_flush(1);
        log::debug!("wrote cell {} to {}", current.coord, self.table_name);
        Ok(())
    }

    fn write_row(&self, coord: &str, cell: &C) -> Result<()> {
        let payload = codec::encode(cell)?;
        self.connection()?.execute(
            &format!(
                "INSERT OR REPLACE INTO {} (id, value) VALUES (?1, ?2)",
                self.table_name
            ),
            params![coord, payload],
        )?;
        Ok(())
    }

    /// Ensure `coord` is the staged cell, loading it from the table if needed.
    /// Returns `false` if the coordinate is not cached.
    fn stage(&mut self, coord: &str) -> Result<bool> {
        self.connection()?;
        if self.is_current(coord) {
            self.base.record_lookup(true);
            log::trace!("current cell hit for {coord}");
            return Ok(true);
        }
        self.base.record_lookup(false);
        self.store_data()?;

        let payload: Option<Vec<u8>> = self
            .connection()?
            .query_row(
                &format!("SELECT value FROM {} WHERE id = ?1", self.table_name),
                params![coord],
                |r| r.get(0),
            )
            .optional()?;
        let Some(payload) = payload else {
            return Ok(false);
        };

        let mut cell: C = codec::decode(&payload)?;
        self.base.attach(&mut cell);
        self.current = Some(CurrentCell {
            coord: coord.to_string(),
            cell,
            dirty: false,
        });
        self.base.record_load();
        Ok(true)
    }

    fn delete_row(&self, coord: &str) -> Result<()> {
        self.connection()?.execute(
            &format!("DELETE FROM {} WHERE id = ?1", self.table_name),
            params![coord],
        )?;
        Ok(())
    }
}

impl<C: CachedCell> CellCache for SqliteCache<C> {
    type Cell = C;

    fn is_data_set(&self, coord: &str) -> Result<bool> {
        let conn = self.connection()?;
        if self.is_current(coord) {
            return Ok(true);
        }
        let found = conn
            .query_row(
                &format!("SELECT 1 FROM {} WHERE id = ?1", self.table_name),
                params![coord],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn add_cache_data(&mut self, coord: &str, mut cell: C) -> Result<&mut C> {
        self.connection()?;
        if self.current.is_some() && !self.is_current(coord) {
            self.store_data()?;
        }
        if let Some(mut replaced) = self.current.take() {
            replaced.cell.detach();
        }

        self.base.attach(&mut cell);
        let current = self.current.insert(CurrentCell {
            coord: coord.to_string(),
            cell,
            dirty: true,
        });
        Ok(&mut current.cell)
    }

    fn get_cache_data(&mut self, coord: &str) -> Result<Option<&C>> {
        if !self.stage(coord)? {
            return Ok(None);
        }
        Ok(self.current.as_ref().map(|current| &current.cell))
    }

    fn get_cache_data_mut(&mut self, coord: &str) -> Result<Option<&mut C>> {
        if !self.stage(coord)? {
            return Ok(None);
        }
        Ok(self.current.as_mut().map(|current| {
            current.dirty = true;
            &mut current.cell
        }))
    }

    fn take_cache_data(&mut self, coord: &str) -> Result<Option<C>> {
        if !self.stage(coord)? {
            return Ok(None);
        }
        self.delete_row(coord)?;
        Ok(self.current.take().map(|mut current| {
            current.cell.detach();
            current.cell
        }))
    }

    fn delete_cache_data(&mut self, coord: &str) -> Result<()> {
        self.connection()?;
        if self.is_current(coord) {
            if let Some(mut current) = self.current.take() {
                current.cell.detach();
            }
        }
        self.delete_row(coord)
    }

    fn get_cell_list(&mut self) -> Result<Vec<String>> {
        self.store_data()?;
        let conn = self.connection()?;
        let mut stmt = conn.prepare(&format!("SELECT id FROM {}", self.table_name))?;
        let rows = stmt.query_map([], |r| r.get::<_, String>(0))?;

        let mut cells = Vec::new();
        for id in rows {
            cells.push(id?);
        }
        Ok(cells)
    }

    fn copy_cell_collection(&mut self, parent: Weak<C::Sheet>) -> Result<Self> {
        self.store_data()?;
        let source = self.connection()?;
        let mut clone = Self::new(parent)?;

        let mut select = source.prepare(&format!("SELECT id, value FROM {}", self.table_name))?;
        let rows = select.query_map([], |r| {
            Ok((r.get::<_, String>(0)?, r.get::<_, Vec<u8>>(1)?))
        })?;

        let dest = clone.conn.as_mut().ok_or(CacheError::TornDown)?;
        let tx = dest.transaction()?;
        let mut copied = 0usize;
        {
            let mut insert = tx.prepare(&format!(
                "INSERT INTO {} (id, value) VALUES (?1, ?2)",
                clone.table_name
            ))?;
            for row in rows {
                let (id, value) = row?;
                insert.execute(params![id, value])?;
                copied += 1;
            }
        }
        tx.commit()?;

        log::debug!(
            "copied {copied} cells from {} into {}",
            self.table_name,
            clone.table_name
        );
        Ok(clone)
    }

    fn unset_worksheet_cells(&mut self) -> Result<()> {
        if let Some(mut current) = self.current.take() {
            current.cell.detach();
        }
        self.base.release_parent();
        if let Some(conn) = self.conn.take() {
            conn.close().map_err(|(_, err)| err)?;
            log::debug!("closed sqlite cell table {}", self.table_name);
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

fn create_table(conn: &Connection, table_name: &str) -> rusqlite::Result<()> {
    conn.execute_batch(&format!(
        "CREATE TABLE {table_name} (id TEXT PRIMARY KEY, value BLOB NOT NULL)"
    ))
}
