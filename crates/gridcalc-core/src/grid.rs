//! Bounded cell storage
//!
//! [`Grid`] stores per-cell state sparsely (only cells that were written occupy memory) but
//! enforces the sheet's [`Dimensions`], so every address outside the bounds is rejected
//! rather than silently created.

use crate::cell::{CellAddress, CellRange};
use crate::error::{Error, Result};
use crate::{MAX_COLS, MAX_ROWS};
use std::collections::BTreeMap;

/// Size of a sheet, in rows and columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Dimensions {
    /// Number of rows
    pub rows: u32,
    /// Number of columns
    pub cols: u16,
}

impl Dimensions {
    /// Create dimensions, checking they are non-empty and within the sheet limits
    pub fn new(rows: u32, cols: u16) -> Result<Self> {
        if rows == 0 || cols == 0 || rows > MAX_ROWS || cols > MAX_COLS {
            return Err(Error::InvalidDimensions {
                rows,
                cols: cols as u32,
            });
        }
        Ok(Self { rows, cols })
    }

    /// Check whether an address lies inside these dimensions
    pub fn contains(&self, addr: &CellAddress) -> bool {
        addr.row < self.rows && addr.col < self.cols
    }

    /// Check whether a whole range lies inside these dimensions
    pub fn contains_range(&self, range: &CellRange) -> bool {
        self.contains(&range.start) && self.contains(&range.end)
    }

    /// Validate an address against these dimensions
    pub fn check(&self, addr: &CellAddress) -> Result<()> {
        if addr.row >= self.rows {
            return Err(Error::RowOutOfBounds(addr.row, self.rows - 1));
        }
        if addr.col >= self.cols {
            return Err(Error::ColumnOutOfBounds(addr.col as u32, self.cols - 1));
        }
        Ok(())
    }
}

/// Sparse, bounded, row-major storage
///
/// Structure: `BTreeMap<row_index, BTreeMap<col_index, T>>`
#[derive(Debug, Clone)]
pub struct Grid<T> {
    dimensions: Dimensions,
    rows: BTreeMap<u32, BTreeMap<u16, T>>,
}

impl<T> Grid<T> {
    /// Create an empty grid with the given dimensions
    pub fn new(dimensions: Dimensions) -> Self {
        Self {
            dimensions,
            rows: BTreeMap::new(),
        }
    }

    /// Get the grid dimensions
    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Check whether an address lies inside the grid
    pub fn contains(&self, addr: &CellAddress) -> bool {
        self.dimensions.contains(addr)
    }

    /// Get the entry at an address
    pub fn get(&self, addr: CellAddress) -> Option<&T> {
        self.rows.get(&addr.row).and_then(|r| r.get(&addr.col))
    }

    /// Get a mutable entry at an address
    pub fn get_mut(&mut self, addr: CellAddress) -> Option<&mut T> {
        self.rows.get_mut(&addr.row).and_then(|r| r.get_mut(&addr.col))
    }

    /// Store an entry, returning the previous one
    pub fn insert(&mut self, addr: CellAddress, value: T) -> Result<Option<T>> {
        self.dimensions.check(&addr)?;
        Ok(self.rows.entry(addr.row).or_default().insert(addr.col, value))
    }

    /// Remove an entry
    pub fn remove(&mut self, addr: CellAddress) -> Option<T> {
        let row_map = self.rows.get_mut(&addr.row)?;
        let result = row_map.remove(&addr.col);

        // Clean up empty rows
        if row_map.is_empty() {
            self.rows.remove(&addr.row);
        }

        result
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.rows.values().map(|r| r.len()).sum()
    }

    /// Check if no entries are stored
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate over stored entries in row-major order
    pub fn iter(&self) -> impl Iterator<Item = (CellAddress, &T)> {
        self.rows.iter().flat_map(|(&row, cols)| {
            cols.iter()
                .map(move |(&col, value)| (CellAddress::new(row, col), value))
        })
    }

    /// Iterate over mutable stored entries in row-major order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (CellAddress, &mut T)> {
        self.rows.iter_mut().flat_map(|(&row, cols)| {
            cols.iter_mut()
                .map(move |(&col, value)| (CellAddress::new(row, col), value))
        })
    }

    /// Iterate over the addresses of stored entries
    pub fn addresses(&self) -> impl Iterator<Item = CellAddress> + '_ {
        self.iter().map(|(addr, _)| addr)
    }
}
