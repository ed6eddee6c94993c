use core::fmt;

use serde::{Deserialize, Serialize};

/// Storage backend used by a [`crate::CellCollection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CacheMethod {
    /// Bounded bucket flushed as one unit into a spooled temp stream.
    #[default]
    Bucketed,
    /// One staged cell written through to an in-memory SQLite table.
    Sqlite,
}

impl CacheMethod {
    /// Whether the engine this method needs is compiled into the current build.
    ///
    /// Callers should check this before selecting a method and fall back to
    /// [`CacheMethod::Bucketed`] otherwise.
    pub fn is_available(self) -> bool {
        match self {
            CacheMethod::Bucketed => true,
            CacheMethod::Sqlite => cfg!(feature = "sqlite"),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CacheMethod::Bucketed => "bucketed",
            CacheMethod::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for CacheMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheSettings {
    /// Backend to construct (default: bucketed).
    pub method: CacheMethod,
    /// Max number of cells staged per bucket before it is flushed (default: 20).
    pub bucket_max_size: usize,
    /// Bytes the bucketed stream keeps in memory before spilling to a temp
    /// file (default: 1MB).
    pub memory_cache_size: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            method: CacheMethod::Bucketed,
            bucket_max_size: 20,
            memory_cache_size: 1024 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let settings: CacheSettings =
            serde_json::from_str(r#"{"method":"sqlite","bucketMaxSize":5}"#).expect("parse");
        assert_eq!(settings.method, CacheMethod::Sqlite);
        assert_eq!(settings.bucket_max_size, 5);
        assert_eq!(settings.memory_cache_size, 1024 * 1024);
    }

    #[test]
    fn bucketed_is_always_available() {
        assert!(CacheMethod::Bucketed.is_available());
        assert_eq!(CacheMethod::Sqlite.is_available(), cfg!(feature = "sqlite"));
    }
}
