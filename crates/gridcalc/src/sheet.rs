//! The sheet: cells, their formulas and the dependency graph between them

use crate::calculation::{CalculationOptions, CalculationStats};
use crate::cell::{Cell, CellContent};
use crate::error::{EngineError, Result};
use gridcalc_core::{CellAddress, Dimensions, Grid, Value};
use gridcalc_formula::{
    extract_precedents, parse_formula, DependencyGraph, FunctionDef, FunctionRegistry,
};
use std::collections::BTreeSet;

/// A bounded grid of cells with formulas, kept consistent under edits
///
/// Edits are validated before anything changes: a formula that does not parse or that
/// would introduce a circular reference is rejected and the sheet is left as it was.
#[derive(Debug, Clone)]
pub struct Sheet {
    pub(crate) cells: Grid<Cell>,
    pub(crate) graph: DependencyGraph,
    pub(crate) functions: FunctionRegistry,
    pub(crate) options: CalculationOptions,
    pub(crate) stats: CalculationStats,
}

impl Sheet {
    /// Create an empty sheet with default options
    pub fn new(rows: u32, cols: u16) -> Result<Self> {
        let dimensions = Dimensions::new(rows, cols)?;
        Ok(Self::with_options(dimensions, CalculationOptions::default()))
    }

    /// Create an empty sheet with custom options
    pub fn with_options(dimensions: Dimensions, options: CalculationOptions) -> Self {
        Self {
            cells: Grid::new(dimensions),
            graph: DependencyGraph::new(),
            functions: FunctionRegistry::new(),
            options,
            stats: CalculationStats::default(),
        }
    }

    /// Get the sheet dimensions
    pub fn dimensions(&self) -> Dimensions {
        self.cells.dimensions()
    }

    /// Get the calculation options
    pub fn options(&self) -> &CalculationOptions {
        &self.options
    }

    /// Get the functions available to formulas
    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub(crate) fn check_bounds(&self, address: CellAddress) -> Result<()> {
        if self.cells.contains(&address) {
            Ok(())
        } else {
            Err(EngineError::OutOfBounds {
                address,
                dimensions: self.dimensions(),
            })
        }
    }

    // === Editing ===

    /// Install a formula (text without a leading `=`)
    ///
    /// The cell and everything that depends on it become dirty; nothing is evaluated
    /// until a value is read.
    pub fn set_formula(&mut self, address: CellAddress, source: &str) -> Result<()> {
        self.check_bounds(address)?;

        let ast = parse_formula(source).map_err(|e| {
            tracing::debug!("rejected formula for {}: {}", address, e);
            e
        })?;

        let precedents = extract_precedents(&ast, self.dimensions(), self.options.max_range_cells);
        self.graph
            .set_precedents(address, &precedents)
            .map_err(|e| {
                tracing::debug!("rejected formula for {}: {}", address, e);
                e
            })?;

        let cell = Cell::with_formula(source.to_string(), ast);
        self.cells.insert(address, cell)?;
        self.invalidate_dependents(address);

        tracing::debug!(
            "installed formula {} = {} ({} precedents)",
            address,
            source,
            precedents.len()
        );
        Ok(())
    }

    /// Store a value, replacing any formula
    ///
    /// Storing [`Value::Empty`] clears the cell.
    pub fn set_literal(&mut self, address: CellAddress, value: Value) -> Result<()> {
        self.check_bounds(address)?;

        self.graph.clear_precedents(address);
        if value.is_empty() {
            self.cells.remove(address);
        } else {
            self.cells.insert(address, Cell::with_literal(value))?;
        }
        self.invalidate_dependents(address);

        Ok(())
    }

    /// Clear a cell
    pub fn clear_cell(&mut self, address: CellAddress) -> Result<()> {
        self.set_literal(address, Value::Empty)
    }

    /// Enter text the way a user types it into a cell
    ///
    /// A leading `=` makes the rest a formula. Otherwise numbers and `TRUE`/`FALSE`
    /// (any case) become literals, blank input clears the cell and anything else is
    /// stored as text.
    ///
    /// ```rust
    /// use gridcalc::{Sheet, Value};
    ///
    /// let mut sheet = Sheet::new(5, 5).unwrap();
    /// sheet.set_input("A1", "2").unwrap();
    /// sheet.set_input("B1", "=A1 ^ 3").unwrap();
    /// assert_eq!(sheet.value("B1").unwrap(), Value::Number(8.0));
    /// ```
    pub fn set_input(&mut self, address: &str, input: &str) -> Result<()> {
        let address = CellAddress::parse(address)?;

        if let Some(formula) = input.strip_prefix('=') {
            return self.set_formula(address, formula);
        }

        self.set_literal(address, parse_literal(input))
    }

    /// Register a function for use in formulas
    ///
    /// Every formula cell is marked dirty, since a call that failed before may now
    /// succeed, or a replaced function may give a different result.
    pub fn register_function(&mut self, def: FunctionDef) {
        tracing::debug!("registering function {}", def.name);
        self.functions.register(def);
        self.invalidate_all();
    }

    // === Reading ===

    /// Get the up-to-date value of a cell by A1 address
    pub fn value(&mut self, address: &str) -> Result<Value> {
        let address = CellAddress::parse(address)?;
        self.calculate(address)
    }

    /// Get a cell, if it holds anything
    pub fn cell(&self, address: CellAddress) -> Option<&Cell> {
        self.cells.get(address)
    }

    /// Get the content of a cell
    pub fn content(&self, address: CellAddress) -> CellContent {
        self.cell(address)
            .map(|cell| cell.content().clone())
            .unwrap_or_default()
    }

    /// Get the formula text of a cell
    pub fn formula(&self, address: CellAddress) -> Option<&str> {
        self.cell(address).and_then(Cell::formula)
    }

    /// Check if a formula cell's cached value is stale
    pub fn is_dirty(&self, address: CellAddress) -> bool {
        self.cell(address).map_or(false, Cell::is_dirty)
    }

    /// Cells the given cell's formula reads
    pub fn precedents_of(&self, address: CellAddress) -> BTreeSet<CellAddress> {
        self.graph.precedents(address).collect()
    }

    /// Cells whose formulas read the given cell
    pub fn dependents_of(&self, address: CellAddress) -> BTreeSet<CellAddress> {
        self.graph.dependents(address).collect()
    }

    /// Addresses of every non-empty cell, in row-major order
    pub fn addresses(&self) -> impl Iterator<Item = CellAddress> + '_ {
        self.cells.addresses()
    }
}

/// Interpret typed input that is not a formula
fn parse_literal(input: &str) -> Value {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Value::Empty;
    }
    if trimmed.eq_ignore_ascii_case("true") {
        return Value::Boolean(true);
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return Value::Boolean(false);
    }
    match trimmed.parse::<f64>() {
        Ok(n) if n.is_finite() => Value::Number(n),
        _ => Value::text(input),
    }
}
