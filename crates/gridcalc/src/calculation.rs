//! Sheet calculation engine
//!
//! Formula cells are recalculated lazily: an edit only marks the edited cell and its
//! transitive dependents dirty, and a read evaluates whatever dirty cells it depends on,
//! precedents first, each at most once.
//!
//! # Example
//!
//! ```rust
//! use gridcalc::prelude::*;
//!
//! let mut sheet = Sheet::new(10, 10).unwrap();
//! sheet.set_input("A1", "10").unwrap();
//! sheet.set_input("A2", "20").unwrap();
//! sheet.set_input("A3", "=A1+A2").unwrap();
//!
//! let stats = sheet.calculate_all();
//! assert_eq!(stats.evaluations, 1);
//! assert_eq!(sheet.value("A3").unwrap(), Value::Number(30.0));
//! ```

use crate::cell::Cell;
use crate::error::Result;
use crate::sheet::Sheet;
use gridcalc_core::{CellAddress, Dimensions, Grid, Value};
use gridcalc_formula::{evaluate, CellResolver, EvaluationContext, TextTruthiness};

/// Options for sheet calculation
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CalculationOptions {
    /// How text is read where a boolean is required
    pub truthiness: TextTruthiness,
    /// Ranges with more cells than this evaluate to `#REF!` and are not tracked as
    /// precedents
    pub max_range_cells: u64,
}

impl Default for CalculationOptions {
    fn default() -> Self {
        Self {
            truthiness: TextTruthiness::Keyword,
            max_range_cells: gridcalc_formula::DEFAULT_MAX_RANGE_CELLS,
        }
    }
}

impl CalculationOptions {
    pub fn with_truthiness(mut self, truthiness: TextTruthiness) -> Self {
        self.truthiness = truthiness;
        self
    }

    pub fn with_max_range_cells(mut self, max_range_cells: u64) -> Self {
        self.max_range_cells = max_range_cells;
        self
    }
}

/// Calculation statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalculationStats {
    /// Total number of formula cells
    pub formula_count: usize,
    /// Number of formula evaluations performed
    pub evaluations: usize,
    /// Number of reads answered from a clean cached value
    pub cache_hits: usize,
    /// Number of cells marked dirty by cascades
    pub invalidations: usize,
    /// Number of formula cells whose cached value is an error
    pub errors: usize,
}

/// Resolves references against the sheet's cells
struct SheetResolver<'a> {
    cells: &'a Grid<Cell>,
}

impl CellResolver for SheetResolver<'_> {
    fn dimensions(&self) -> Dimensions {
        self.cells.dimensions()
    }

    fn value_at(&self, addr: CellAddress) -> Value {
        self.cells
            .get(addr)
            .map(Cell::current_value)
            .unwrap_or_default()
    }
}

impl Sheet {
    /// Get the up-to-date value of a cell
    ///
    /// Empty cells are [`Value::Empty`]; evaluation failures are [`Value::Error`]. Only an
    /// address outside the sheet is an `Err`.
    pub fn calculate(&mut self, addr: CellAddress) -> Result<Value> {
        self.check_bounds(addr)?;

        match self.cells.get(addr) {
            None => return Ok(Value::Empty),
            Some(cell) if !cell.needs_evaluation() => {
                if cell.is_formula() {
                    self.stats.cache_hits += 1;
                }
                return Ok(cell.current_value());
            }
            Some(_) => {}
        }

        self.recalculate(addr);

        Ok(self
            .cells
            .get(addr)
            .map(Cell::current_value)
            .unwrap_or_default())
    }

    /// Bring every formula cell up to date
    ///
    /// Returns statistics for this run: `evaluations` counts only the cells evaluated
    /// now, `errors` the formula cells left holding an error.
    pub fn calculate_all(&mut self) -> CalculationStats {
        let before = self.stats.evaluations;

        let pending: Vec<CellAddress> = self
            .cells
            .iter()
            .filter(|(_, cell)| cell.needs_evaluation())
            .map(|(addr, _)| addr)
            .collect();

        for addr in pending {
            self.recalculate(addr);
        }

        let stats = CalculationStats {
            evaluations: self.stats.evaluations - before,
            ..self.stats()
        };
        tracing::debug!(
            "calculated {} of {} formula cells",
            stats.evaluations,
            stats.formula_count
        );
        stats
    }

    /// Evaluate `root` and every dirty cell it depends on, precedents first
    ///
    /// Post-order walk with an explicit stack: a cell is pushed once to expand its
    /// precedents and once more to be evaluated after them. The graph is acyclic, so
    /// the walk terminates; cells already clean when popped are skipped.
    fn recalculate(&mut self, root: CellAddress) {
        let mut stack = vec![(root, false)];

        while let Some((addr, expanded)) = stack.pop() {
            if !self.needs_evaluation(addr) {
                continue;
            }

            if expanded {
                self.evaluate_cell(addr);
                continue;
            }

            stack.push((addr, true));
            for precedent in self.graph.precedents(addr) {
                if self.needs_evaluation(precedent) {
                    stack.push((precedent, false));
                }
            }
        }
    }

    fn needs_evaluation(&self, addr: CellAddress) -> bool {
        self.cells
            .get(addr)
            .map_or(false, |cell| cell.needs_evaluation())
    }

    /// Evaluate one formula cell against its (already fresh) precedents and cache it
    fn evaluate_cell(&mut self, addr: CellAddress) {
        let Some(ast) = self.cells.get(addr).and_then(Cell::ast) else {
            return;
        };

        let resolver = SheetResolver { cells: &self.cells };
        let ctx = EvaluationContext::new(&resolver, &self.functions)
            .with_truthiness(self.options.truthiness)
            .with_max_range_cells(self.options.max_range_cells);
        let value = evaluate(ast, &ctx);

        self.stats.evaluations += 1;
        tracing::trace!("evaluated {} = {:?}", addr, value);

        if let Some(cell) = self.cells.get_mut(addr) {
            cell.cached_value = Some(value);
            cell.dirty = false;
        }
    }

    /// Mark every transitive dependent of `addr` dirty
    ///
    /// The walk stops at cells that are already dirty: a dirty cell's dependents are
    /// dirty too, since reading any of them would have cleaned it first.
    pub(crate) fn invalidate_dependents(&mut self, addr: CellAddress) {
        let cells = &mut self.cells;
        let mut marked = 0;

        self.graph.walk_dependents(addr, |dependent| match cells.get_mut(dependent) {
            Some(cell) if !cell.dirty => {
                cell.dirty = true;
                marked += 1;
                true
            }
            _ => false,
        });

        self.stats.invalidations += marked;
        if marked > 0 {
            tracing::trace!("{} invalidated {} dependent cells", addr, marked);
        }
    }

    /// Mark every formula cell dirty
    pub(crate) fn invalidate_all(&mut self) {
        let mut marked = 0;
        for (_, cell) in self.cells.iter_mut() {
            if cell.is_formula() && !cell.dirty {
                cell.dirty = true;
                marked += 1;
            }
        }
        self.stats.invalidations += marked;
    }

    /// Statistics since creation or the last [`reset_stats`](Sheet::reset_stats)
    ///
    /// `formula_count` and `errors` describe the sheet as it is now.
    pub fn stats(&self) -> CalculationStats {
        let mut stats = self.stats.clone();
        stats.formula_count = 0;
        stats.errors = 0;

        for (_, cell) in self.cells.iter().filter(|(_, cell)| cell.is_formula()) {
            stats.formula_count += 1;
            if cell.cached_value().map_or(false, Value::is_error) {
                stats.errors += 1;
            }
        }

        stats
    }

    /// Reset the evaluation, cache-hit and invalidation counters
    pub fn reset_stats(&mut self) {
        self.stats = CalculationStats::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridcalc_core::ErrorKind;

    fn addr(s: &str) -> CellAddress {
        CellAddress::parse(s).unwrap()
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_options_are_serializable() {
        fn assert_serde<T: serde::Serialize + serde::de::DeserializeOwned>() {}
        assert_serde::<CalculationOptions>();
        assert_serde::<TextTruthiness>();
    }

    #[test]
    fn test_simple_calculation() {
        let mut sheet = Sheet::new(10, 10).unwrap();
        sheet.set_literal(addr("A1"), Value::Number(10.0)).unwrap();
        sheet.set_literal(addr("A2"), Value::Number(20.0)).unwrap();
        sheet.set_formula(addr("A3"), "A1+A2").unwrap();

        assert_eq!(sheet.calculate(addr("A3")).unwrap(), Value::Number(30.0));
        assert!(!sheet.is_dirty(addr("A3")));
    }

    #[test]
    fn test_chain_evaluates_bottom_up_once() {
        let mut sheet = Sheet::new(10, 10).unwrap();
        sheet.set_literal(addr("A1"), Value::Number(1.0)).unwrap();
        sheet.set_formula(addr("B1"), "A1*2").unwrap();
        sheet.set_formula(addr("C1"), "B1+A1").unwrap();
        sheet.set_formula(addr("D1"), "C1+B1").unwrap();

        assert_eq!(sheet.calculate(addr("D1")).unwrap(), Value::Number(5.0));
        assert_eq!(sheet.stats().evaluations, 3);

        // Everything on the way is now clean
        assert_eq!(sheet.calculate(addr("B1")).unwrap(), Value::Number(2.0));
        assert_eq!(sheet.stats().evaluations, 3);
        assert_eq!(sheet.stats().cache_hits, 1);
    }

    #[test]
    fn test_deep_chain_does_not_overflow() {
        let mut sheet = Sheet::new(20_000, 1).unwrap();
        sheet.set_literal(addr("A1"), Value::Number(0.0)).unwrap();
        for row in 2..=20_000 {
            sheet
                .set_formula(addr(&format!("A{row}")), &format!("A{}+1", row - 1))
                .unwrap();
        }

        assert_eq!(
            sheet.calculate(addr("A20000")).unwrap(),
            Value::Number(19_999.0)
        );
    }

    #[test]
    fn test_cascade_stops_at_dirty_cells() {
        let mut sheet = Sheet::new(10, 10).unwrap();
        sheet.set_literal(addr("A1"), Value::Number(1.0)).unwrap();
        sheet.set_formula(addr("B1"), "A1").unwrap();
        sheet.set_formula(addr("C1"), "B1").unwrap();
        sheet.calculate(addr("C1")).unwrap();
        sheet.reset_stats();

        sheet.set_literal(addr("A1"), Value::Number(2.0)).unwrap();
        assert_eq!(sheet.stats().invalidations, 2);

        // B1 and C1 are already dirty
        sheet.set_literal(addr("A1"), Value::Number(3.0)).unwrap();
        assert_eq!(sheet.stats().invalidations, 2);
        assert_eq!(sheet.calculate(addr("C1")).unwrap(), Value::Number(3.0));
    }

    #[test]
    fn test_calculate_all() {
        let mut sheet = Sheet::new(10, 10).unwrap();
        sheet.set_formula(addr("A1"), "1/0").unwrap();
        sheet.set_formula(addr("A2"), "A1+1").unwrap();
        sheet.set_formula(addr("A3"), "2*3").unwrap();

        let stats = sheet.calculate_all();
        assert_eq!(stats.formula_count, 3);
        assert_eq!(stats.evaluations, 3);
        assert_eq!(stats.errors, 2);

        let stats = sheet.calculate_all();
        assert_eq!(stats.evaluations, 0);
        assert_eq!(
            sheet.cell(addr("A2")).and_then(Cell::cached_value),
            Some(&Value::Error(ErrorKind::DivisionByZero))
        );
    }

    #[test]
    fn test_options_reach_evaluation() {
        let dims = Dimensions::new(10, 10).unwrap();
        let options = CalculationOptions::default()
            .with_truthiness(TextTruthiness::NonEmpty)
            .with_max_range_cells(5);
        let mut sheet = Sheet::with_options(dims, options);

        sheet.set_literal(addr("A1"), Value::text("yes")).unwrap();
        sheet.set_formula(addr("B1"), "IF(A1, 1, 2)").unwrap();
        sheet.set_formula(addr("B2"), "SUM(A1:A6)").unwrap();

        assert_eq!(sheet.calculate(addr("B1")).unwrap(), Value::Number(1.0));
        assert_eq!(
            sheet.calculate(addr("B2")).unwrap(),
            Value::Error(ErrorKind::UnresolvedReference)
        );
        assert!(sheet.precedents_of(addr("B2")).is_empty());
    }
}
