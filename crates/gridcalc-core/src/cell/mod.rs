//! Cell-related types and utilities
//!
//! This module contains:
//! - [`CellAddress`] - A cell's location (e.g., "A1")
//! - [`CellRange`] - A rectangular range of cells (e.g., "A1:B10")
//! - [`Value`] - A scalar a cell holds or a formula produces
//! - [`ErrorKind`] - Evaluation failures carried as values

mod address;
mod value;

pub use address::{CellAddress, CellRange, CellRangeIterator};
pub use value::{ErrorKind, Value};
