//! Row/column positions derived from A1-style cache keys.
//!
//! Lookups treat keys as opaque strings. Positions are only used to order listings and to
//! bound the used range; keys that are not A1 references are still valid cache keys.

const MAX_ROW: u32 = 1_048_576;
const MAX_COL: u32 = 16_384;

/// Zero-based row and column of an A1 key (`A1` is `row = 0, col = 0`). Orders row-major.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellPosition {
    pub row: u32,
    pub col: u32,
}

impl CellPosition {
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Position of an A1 key such as `B7` or `$B$7`; `None` for anything else.
    pub fn parse(key: &str) -> Option<Self> {
        let key = key.strip_prefix('$').unwrap_or(key);
        let split = key.find(|c: char| !c.is_ascii_alphabetic())?;
        let (letters, rest) = key.split_at(split);
        let digits = rest.strip_prefix('$').unwrap_or(rest);
        if letters.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        let col = letters.bytes().try_fold(0u32, |acc, b| {
            acc.checked_mul(26)?
                .checked_add(u32::from(b.to_ascii_uppercase() - b'A') + 1)
        })?;
        let row: u32 = digits.parse().ok()?;
        if !(1..=MAX_COL).contains(&col) || !(1..=MAX_ROW).contains(&row) {
            return None;
        }
        Some(Self::new(row - 1, col - 1))
    }
}

#[derive(PartialEq, Eq, PartialOrd, Ord)]
enum SortKey {
    Position(CellPosition),
    Other(String),
}

/// Sort cache keys row-major. Keys that don't parse as A1 go last, in byte order.
pub(crate) fn sort_cell_list(keys: &mut [String]) {
    keys.sort_by_cached_key(|key| match CellPosition::parse(key) {
        Some(pos) => SortKey::Position(pos),
        None => SortKey::Other(key.clone()),
    });
}

/// Highest row and highest column (taken independently) over the A1 keys in `keys`.
pub(crate) fn highest_row_and_column<'a>(
    keys: impl IntoIterator<Item = &'a String>,
) -> Option<CellPosition> {
    let positions: Vec<CellPosition> = keys
        .into_iter()
        .filter_map(|key| CellPosition::parse(key))
        .collect();
    let row = positions.iter().map(|pos| pos.row).max()?;
    let col = positions.iter().map(|pos| pos.col).max()?;
    Some(CellPosition::new(row, col))
}
