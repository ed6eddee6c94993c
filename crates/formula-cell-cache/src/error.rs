use thiserror::Error;

use crate::settings::CacheMethod;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[cfg(feature = "sqlite")]
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("failed to encode cells: {0}")]
    Encode(#[from] ciborium::ser::Error<std::io::Error>),
    #[error("failed to decode cells: {0}")]
    Decode(#[from] ciborium::de::Error<std::io::Error>),
    /// A serialized bucket does not fit the `u32` length of an index entry.
    #[error("serialized bucket of {0} bytes exceeds the maximum unit size")]
    UnitTooLarge(usize),
    #[error("cache method {0} is not available in this build")]
    Unavailable(CacheMethod),
    /// The cache was used after `unset_worksheet_cells` released its storage.
    #[error("cell cache used after its storage was released")]
    TornDown,
}

pub type Result<T> = std::result::Result<T, CacheError>;
