use std::sync::Weak;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// A cell object that can be parked in a [`crate::CellCache`].
///
/// Cells carry a non-owning link back to the sheet that owns them. The cache calls
/// [`CachedCell::detach`] before a cell is serialized and [`CachedCell::attach`] after every
/// successful load, so the link must never be part of the serialized form (mark the field
/// `#[serde(skip)]`).
///
/// ```
/// use std::sync::Weak;
/// use formula_cell_cache::CachedCell;
/// use serde::{Deserialize, Serialize};
///
/// struct Sheet;
///
/// #[derive(Serialize, Deserialize)]
/// struct Cell {
///     value: f64,
///     #[serde(skip)]
///     parent: Option<Weak<Sheet>>,
/// }
///
/// impl CachedCell for Cell {
///     type Sheet = Sheet;
///
///     fn attach(&mut self, parent: Weak<Sheet>) {
///         self.parent = Some(parent);
///     }
///
///     fn detach(&mut self) {
///         self.parent = None;
///     }
/// }
/// ```
pub trait CachedCell: Serialize + DeserializeOwned {
    type Sheet;

    /// Bind the cell to its owning sheet.
    fn attach(&mut self, parent: Weak<Self::Sheet>);

    /// Drop the sheet link. Must be a no-op on an already detached cell.
    fn detach(&mut self);
}
