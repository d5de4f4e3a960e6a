//! Engine error types

use gridcalc_core::{CellAddress, Dimensions};
use gridcalc_formula::{CircularReference, FormulaError};
use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that reject an engine operation
///
/// A rejected edit leaves the sheet exactly as it was. Evaluation failures are not
/// errors: they are cached as [`Value::Error`](gridcalc_core::Value::Error).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The formula text could not be lexed or parsed
    #[error(transparent)]
    Formula(#[from] FormulaError),

    /// The formula would make a cell depend on itself
    #[error(transparent)]
    CircularReference(#[from] CircularReference),

    /// An address outside the sheet
    #[error("cell {address} is outside the sheet ({} rows x {} columns)", .dimensions.rows, .dimensions.cols)]
    OutOfBounds {
        address: CellAddress,
        dimensions: Dimensions,
    },

    /// A malformed A1 address or invalid sheet size
    #[error("Address error: {0}")]
    Address(#[from] gridcalc_core::Error),
}
