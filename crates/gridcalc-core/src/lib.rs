//! # gridcalc-core
//!
//! Core data structures for the gridcalc formula engine.
//!
//! This crate provides the fundamental types used throughout gridcalc:
//! - [`CellAddress`] and [`CellRange`] - Zero-based cell addressing and rectangular ranges,
//!   plus the A1 text codec used at the system boundary
//! - [`Value`] and [`ErrorKind`] - The values a cell can hold or a formula can produce
//! - [`Grid`] and [`Dimensions`] - Bounded sparse storage for per-cell state
//!
//! ## Example
//!
//! ```rust
//! use gridcalc_core::{CellAddress, CellRange, Value};
//!
//! let addr = CellAddress::parse("B3").unwrap();
//! assert_eq!((addr.row, addr.col), (2, 1));
//! assert_eq!(addr.to_string(), "B3");
//!
//! let range = CellRange::parse("A1:B2").unwrap();
//! assert_eq!(range.cells().count(), 4);
//!
//! assert_eq!(Value::from(42.0), Value::Number(42.0));
//! ```

pub mod cell;
pub mod error;
pub mod grid;

// Re-exports for convenience
pub use cell::{CellAddress, CellRange, CellRangeIterator, ErrorKind, Value};
pub use error::{Error, Result};
pub use grid::{Dimensions, Grid};

/// Maximum number of rows in a sheet
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a sheet
pub const MAX_COLS: u16 = 16_384;
