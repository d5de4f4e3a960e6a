//! Prelude module - common imports for gridcalc users
//!
//! ```rust
//! use gridcalc::prelude::*;
//! ```

pub use crate::{
    // Calculation types
    CalculationOptions,
    CalculationStats,
    // Cell types
    Cell,
    CellAddress,
    CellContent,
    CellRange,
    Dimensions,
    // Error types
    EngineError,
    ErrorKind,
    // Function types
    FunctionDef,
    FunctionImpl,
    Result,
    SharedSheet,
    // Main types
    Sheet,
    TextTruthiness,
    Value,
};
