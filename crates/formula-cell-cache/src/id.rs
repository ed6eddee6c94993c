//! Identifiers for persisted cache resources.

use uuid::Uuid;

/// A short, collision-free identifier (32 lowercase hex digits).
pub fn unique_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// A fresh SQLite table name for one cache instance.
///
/// The name is built only from [`unique_id`] output so it is always a valid
/// bare identifier and safe to splice into DDL/DML text.
pub fn table_name() -> String {
    format!("kvp_{}", unique_id())
}
