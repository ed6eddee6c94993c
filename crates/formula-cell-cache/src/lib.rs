//! Out-of-core cell object cache for Formula worksheets.
//!
//! Holding every cell of a very large sheet as a live object can exhaust memory. This crate
//! keeps only a small staging area of live cells and parks the rest in a persisted medium:
//! - [`BucketCache`]: stages a bounded bucket of cells and flushes the whole bucket as one
//!   serialized unit into an append-only spooled temp stream, indexed by `(offset, length)`.
//! - `SqliteCache` (feature `sqlite`): stages exactly one cell and writes it through to an
//!   in-memory SQLite table keyed by coordinate.
//!
//! Both implement the [`CellCache`] contract. [`CellCollection`] picks a backend from
//! [`CacheSettings`] at construction time so the owning sheet never needs to know which one
//! it got.
//!
//! Cells implement [`CachedCell`]: they hold a non-owning [`std::sync::Weak`] link to their
//! sheet which the cache clears before serializing and restores after every load.

pub mod base;
pub mod bucket;
pub mod cache;
pub mod cell;
mod codec;
pub mod error;
pub mod id;
pub mod position;
pub mod settings;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use base::CacheStats;
pub use bucket::{BucketCache, IndexEntry};
pub use cache::{CellCache, CellCollection};
pub use cell::CachedCell;
pub use error::{CacheError, Result};
pub use position::CellPosition;
pub use settings::{CacheMethod, CacheSettings};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteCache;
