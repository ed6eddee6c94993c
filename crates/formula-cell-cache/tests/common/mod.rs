#![allow(dead_code)]

use std::sync::{Arc, Weak};

use formula_cell_cache::{CacheMethod, CacheSettings, CachedCell, CellCollection};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

/// Minimal stand-in for the sheet that owns a cache.
#[derive(Debug)]
pub struct Worksheet {
    pub title: String,
}

pub fn worksheet(title: &str) -> Arc<Worksheet> {
    Arc::new(Worksheet {
        title: title.to_string(),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Number(f64),
    Text(String),
    Formula(String),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TestCell {
    pub value: Value,
    pub style_id: u32,
    #[serde(skip)]
    parent: Option<Weak<Worksheet>>,
}

impl TestCell {
    pub fn number(n: f64) -> Self {
        Self::new(Value::Number(n))
    }

    pub fn text(s: &str) -> Self {
        Self::new(Value::Text(s.to_string()))
    }

    pub fn new(value: Value) -> Self {
        Self {
            value,
            style_id: 0,
            parent: None,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.parent.is_some()
    }

    /// Title of the sheet this cell is bound to, if that sheet is alive.
    pub fn sheet_title(&self) -> Option<String> {
        self.parent
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|sheet| sheet.title.clone())
    }
}

impl CachedCell for TestCell {
    type Sheet = Worksheet;

    fn attach(&mut self, parent: Weak<Worksheet>) {
        self.parent = Some(parent);
    }

    fn detach(&mut self) {
        self.parent = None;
    }
}

/// A cell whose encoding can be made to fail on demand.
#[derive(Debug, Deserialize)]
pub struct FlakyCell {
    pub value: i64,
    #[serde(skip)]
    pub refuse_encode: bool,
    #[serde(skip)]
    parent: Option<Weak<Worksheet>>,
}

impl FlakyCell {
    pub fn new(value: i64) -> Self {
        Self {
            value,
            refuse_encode: false,
            parent: None,
        }
    }

    pub fn refusing(value: i64) -> Self {
        Self {
            refuse_encode: true,
            ..Self::new(value)
        }
    }

    pub fn is_attached(&self) -> bool {
        self.parent.is_some()
    }
}

impl Serialize for FlakyCell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.refuse_encode {
            return Err(serde::ser::Error::custom("cell refused to encode"));
        }
        let mut state = serializer.serialize_struct("FlakyCell", 1)?;
        state.serialize_field("value", &self.value)?;
        state.end()
    }
}

impl CachedCell for FlakyCell {
    type Sheet = Worksheet;

    fn attach(&mut self, parent: Weak<Worksheet>) {
        self.parent = Some(parent);
    }

    fn detach(&mut self) {
        self.parent = None;
    }
}

/// Every cache method compiled into this build.
pub fn available_methods() -> Vec<CacheMethod> {
    [CacheMethod::Bucketed, CacheMethod::Sqlite]
        .into_iter()
        .filter(|method| method.is_available())
        .collect()
}

pub fn settings(method: CacheMethod, bucket_max_size: usize) -> CacheSettings {
    CacheSettings {
        method,
        bucket_max_size,
        ..CacheSettings::default()
    }
}

pub fn collection(sheet: &Arc<Worksheet>, settings: &CacheSettings) -> CellCollection<TestCell> {
    CellCollection::new(Arc::downgrade(sheet), settings).expect("construct cell cache")
}

pub fn flaky_collection(
    sheet: &Arc<Worksheet>,
    settings: &CacheSettings,
) -> CellCollection<FlakyCell> {
    CellCollection::new(Arc::downgrade(sheet), settings).expect("construct cell cache")
}
