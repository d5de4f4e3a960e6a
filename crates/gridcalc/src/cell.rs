//! Per-cell state

use gridcalc_core::Value;
use gridcalc_formula::FormulaExpr;

/// What a cell holds
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellContent {
    #[default]
    Empty,
    /// A value entered directly
    Literal(Value),
    /// A formula, kept both as entered and parsed
    Formula { source: String, ast: FormulaExpr },
}

/// A cell in a [`Sheet`](crate::Sheet)
///
/// `cached_value` and `dirty` are only meaningful for formula cells and are owned by
/// the recalculation engine.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Cell {
    pub(crate) content: CellContent,
    pub(crate) cached_value: Option<Value>,
    pub(crate) dirty: bool,
}

impl Cell {
    pub(crate) fn with_literal(value: Value) -> Self {
        Self {
            content: CellContent::Literal(value),
            cached_value: None,
            dirty: false,
        }
    }

    pub(crate) fn with_formula(source: String, ast: FormulaExpr) -> Self {
        Self {
            content: CellContent::Formula { source, ast },
            cached_value: None,
            dirty: true,
        }
    }

    /// Get the cell content
    pub fn content(&self) -> &CellContent {
        &self.content
    }

    /// Check if the cell holds a formula
    pub fn is_formula(&self) -> bool {
        matches!(self.content, CellContent::Formula { .. })
    }

    /// Formula text, without a leading `=`
    pub fn formula(&self) -> Option<&str> {
        match &self.content {
            CellContent::Formula { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Parsed formula
    pub fn ast(&self) -> Option<&FormulaExpr> {
        match &self.content {
            CellContent::Formula { ast, .. } => Some(ast),
            _ => None,
        }
    }

    /// Last computed value of a formula cell
    pub fn cached_value(&self) -> Option<&Value> {
        self.cached_value.as_ref()
    }

    /// Check if the cached value is stale
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Check if reading this cell requires evaluating its formula
    pub(crate) fn needs_evaluation(&self) -> bool {
        self.is_formula() && (self.dirty || self.cached_value.is_none())
    }

    /// Value as seen by formulas reading this cell
    ///
    /// For formula cells this is the cached value, which callers must bring up to date
    /// first.
    pub(crate) fn current_value(&self) -> Value {
        match &self.content {
            CellContent::Empty => Value::Empty,
            CellContent::Literal(value) => value.clone(),
            CellContent::Formula { .. } => self.cached_value.clone().unwrap_or_default(),
        }
    }
}
