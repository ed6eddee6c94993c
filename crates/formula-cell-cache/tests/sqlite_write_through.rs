#![cfg(feature = "sqlite")]

mod common;

use std::sync::Arc;

use common::{collection, settings, worksheet, TestCell, Value};
use formula_cell_cache::{CacheMethod, CellCache, CellCollection, SqliteCache};
use pretty_assertions::assert_eq;

fn sqlite_cache(sheet: &Arc<common::Worksheet>) -> SqliteCache<TestCell> {
    SqliteCache::new(Arc::downgrade(sheet)).expect("open sqlite cache")
}

#[test]
fn repeated_adds_to_one_coordinate_write_once() {
    let sheet = worksheet("Sheet1");
    let mut cache = sqlite_cache(&sheet);

    cache.add_cache_data("B2", TestCell::number(1.0)).expect("add v1");
    cache.add_cache_data("B2", TestCell::number(2.0)).expect("add v2");
    cache.add_cache_data("B2", TestCell::text("v3")).expect("add v3");
    assert_eq!(cache.stats().flushes, 0);

    // Touching another coordinate pushes B2 out exactly once.
    assert_eq!(cache.get_cache_data("C3").expect("get").map(|c| c.style_id), None);
    let stats = cache.stats();
    assert_eq!(stats.flushes, 1);
    assert_eq!(stats.cells_written, 1);

    let cell = cache.get_cache_data("B2").expect("get").expect("present");
    assert_eq!(cell.value, Value::Text("v3".into()));
    assert_eq!(cell.sheet_title().as_deref(), Some("Sheet1"));
}

#[test]
fn staged_cell_counts_as_set_before_it_is_written() {
    let sheet = worksheet("Sheet1");
    let mut cache = sqlite_cache(&sheet);

    cache.add_cache_data("A1", TestCell::number(1.0)).expect("add");
    assert!(cache.is_data_set("A1").expect("is set"));
    assert_eq!(cache.current_coordinate(), Some("A1"));
    assert_eq!(cache.stats().flushes, 0);
}

#[test]
fn cell_list_flushes_the_staged_cell() {
    let sheet = worksheet("Sheet1");
    let mut cache = sqlite_cache(&sheet);

    cache.add_cache_data("A1", TestCell::number(1.0)).expect("add");
    cache.add_cache_data("A2", TestCell::number(2.0)).expect("add");

    let mut cells = cache.get_cell_list().expect("cell list");
    cells.sort();
    assert_eq!(cells, vec!["A1", "A2"]);
    assert_eq!(cache.current_coordinate(), None);
    assert_eq!(cache.stats().flushes, 2);
}

#[test]
fn deleting_the_staged_cell_drops_its_pending_write() {
    let sheet = worksheet("Sheet1");
    let mut cache = sqlite_cache(&sheet);

    cache.add_cache_data("A1", TestCell::number(1.0)).expect("add");
    cache.delete_cache_data("A1").expect("delete");
    assert_eq!(cache.current_coordinate(), None);

    assert!(cache.get_cell_list().expect("cell list").is_empty());
    assert_eq!(cache.stats().flushes, 0);
}

#[test]
fn deleting_another_cell_keeps_the_staged_cell_dirty() {
    let sheet = worksheet("Sheet1");
    let mut cache = sqlite_cache(&sheet);

    cache.add_cache_data("A1", TestCell::number(1.0)).expect("add");
    cache.add_cache_data("A2", TestCell::number(2.0)).expect("add");
    cache.delete_cache_data("A1").expect("delete");

    assert_eq!(cache.get_cell_list().expect("cell list"), vec!["A2"]);
}

#[test]
fn copy_keeps_the_source_table() {
    let sheet = worksheet("Sheet1");
    let mut cache = sqlite_cache(&sheet);
    cache.add_cache_data("A1", TestCell::number(1.0)).expect("add");
    cache.add_cache_data("A2", TestCell::number(2.0)).expect("add");
    let table = cache.table_name().to_string();

    let copy_sheet = worksheet("Sheet1 (2)");
    let mut copy = cache
        .copy_cell_collection(Arc::downgrade(&copy_sheet))
        .expect("copy");

    assert_eq!(cache.table_name(), table);
    assert_ne!(copy.table_name(), table);
    assert_eq!(copy.stats().flushes, 0);

    let mut cells = copy.get_cell_list().expect("cell list");
    cells.sort();
    assert_eq!(cells, vec!["A1", "A2"]);
    let cell = copy.get_cache_data("A2").expect("get").expect("present");
    assert_eq!(cell.sheet_title().as_deref(), Some("Sheet1 (2)"));
}

#[test]
fn collection_selects_the_sqlite_backend() {
    assert!(CacheMethod::Sqlite.is_available());
    let sheet = worksheet("Sheet1");
    let cache = collection(&sheet, &settings(CacheMethod::Sqlite, 20));
    assert_eq!(cache.method(), CacheMethod::Sqlite);
    assert!(matches!(cache, CellCollection::Sqlite(_)));
}
