//! # gridcalc
//!
//! A spreadsheet formula engine.
//!
//! Cells hold literal values or formulas in a small expression language (arithmetic,
//! comparisons, boolean logic, function calls, cell references and ranges). The engine
//! keeps a dependency graph between cells, rejects edits that would create circular
//! references, and recalculates lazily: an edit only marks the affected cells dirty,
//! and reading a cell evaluates exactly the stale cells it depends on.
//!
//! ## Features
//!
//! - Recursive-descent formula parser with spreadsheet-style precedence
//! - Errors as values (`#DIV/0!`, `#VALUE!`, `#REF!`, ...) that flow through formulas
//! - Short-circuiting `IF`, aggregates over ranges, user-registered functions
//! - All-or-nothing edits: rejected formulas leave the sheet untouched
//! - A lock-protected [`SharedSheet`] for use from several threads
//!
//! ## Example
//!
//! ```rust
//! use gridcalc::prelude::*;
//!
//! let mut sheet = Sheet::new(100, 26).unwrap();
//!
//! sheet.set_input("A1", "1").unwrap();
//! sheet.set_input("B1", "=A1*2").unwrap();
//! sheet.set_input("C1", "=B1+1").unwrap();
//! assert_eq!(sheet.value("C1").unwrap(), Value::Number(3.0));
//!
//! // Editing A1 invalidates B1 and C1; the next read recomputes them
//! sheet.set_literal(CellAddress::parse("A1").unwrap(), Value::Number(5.0)).unwrap();
//! assert_eq!(sheet.value("C1").unwrap(), Value::Number(11.0));
//!
//! // Circular references are rejected
//! assert!(sheet.set_input("A1", "=C1").is_err());
//! ```

pub mod calculation;
pub mod cell;
pub mod error;
pub mod prelude;
pub mod shared;
pub mod sheet;

// Re-export engine types
pub use calculation::{CalculationOptions, CalculationStats};
pub use cell::{Cell, CellContent};
pub use error::{EngineError, Result};
pub use shared::SharedSheet;
pub use sheet::Sheet;

// Re-export core types
pub use gridcalc_core::{CellAddress, CellRange, Dimensions, ErrorKind, Value};

// Re-export formula types
pub use gridcalc_formula::{
    parse_formula, Argument, CircularReference, EvaluationContext, FormulaError, FormulaExpr,
    FunctionDef, FunctionImpl, FunctionRegistry, LexicalError, SyntaxError, TextTruthiness,
};
