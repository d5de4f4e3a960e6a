//! Dependency tracking for formula calculation
//!
//! The graph stores every edge twice, once from each end, and is kept acyclic: a
//! precedent set that would close a loop is rejected before anything is modified.

use crate::ast::{FormulaExpr, Reference};
use crate::error::CircularReference;
use ahash::{AHashMap, AHashSet};
use gridcalc_core::{CellAddress, Dimensions};
use std::collections::{BTreeSet, VecDeque};

/// Extract the cells a formula reads, expanding ranges
///
/// Only in-grid addresses are returned, and ranges larger than `max_range_cells` are
/// skipped: such references always evaluate to `#REF!`, whatever the grid holds.
pub fn extract_precedents(
    expr: &FormulaExpr,
    dimensions: Dimensions,
    max_range_cells: u64,
) -> BTreeSet<CellAddress> {
    let mut precedents = BTreeSet::new();

    for reference in expr.references() {
        match reference {
            Reference::Cell(addr) => {
                if dimensions.contains(&addr) {
                    precedents.insert(addr);
                }
            }
            Reference::Range(range) => {
                if dimensions.contains_range(&range) && range.cell_count() <= max_range_cells {
                    precedents.extend(range.cells());
                }
            }
        }
    }

    precedents
}

/// Dependency graph for formula cells
///
/// Tracks which cells depend on which other cells,
/// enabling cascading invalidation.
#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
    /// Cell → Cells that depend on it (dependents)
    dependents: AHashMap<CellAddress, AHashSet<CellAddress>>,
    /// Cell → Cells it depends on (precedents)
    precedents: AHashMap<CellAddress, AHashSet<CellAddress>>,
}

impl DependencyGraph {
    /// Create a new empty dependency graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the precedents of a cell
    ///
    /// Fails without touching the graph if the new edges would create a cycle.
    pub fn set_precedents(
        &mut self,
        cell: CellAddress,
        precedents: &BTreeSet<CellAddress>,
    ) -> Result<(), CircularReference> {
        if let Some(precedent) = self.find_cycle(cell, precedents) {
            return Err(CircularReference { cell, precedent });
        }

        self.clear_precedents(cell);
        for &precedent in precedents {
            self.add_edge(precedent, cell);
        }

        tracing::trace!("{} now reads {} cells", cell, precedents.len());
        Ok(())
    }

    /// Remove every edge from a cell to its precedents
    ///
    /// Edges from cells that depend on `cell` are kept.
    pub fn clear_precedents(&mut self, cell: CellAddress) {
        let Some(precedents) = self.precedents.remove(&cell) else {
            return;
        };

        for precedent in precedents {
            if let Some(deps) = self.dependents.get_mut(&precedent) {
                deps.remove(&cell);
                if deps.is_empty() {
                    self.dependents.remove(&precedent);
                }
            }
        }
    }

    fn add_edge(&mut self, precedent: CellAddress, dependent: CellAddress) {
        self.dependents
            .entry(precedent)
            .or_default()
            .insert(dependent);
        self.precedents
            .entry(dependent)
            .or_default()
            .insert(precedent);
    }

    /// Get cells that depend on the given cell
    pub fn dependents(&self, cell: CellAddress) -> impl Iterator<Item = CellAddress> + '_ {
        self.dependents
            .get(&cell)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// Get cells that the given cell depends on
    pub fn precedents(&self, cell: CellAddress) -> impl Iterator<Item = CellAddress> + '_ {
        self.precedents
            .get(&cell)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// Check whether `dependent` reads `precedent` directly
    pub fn depends_on(&self, dependent: CellAddress, precedent: CellAddress) -> bool {
        self.precedents
            .get(&dependent)
            .map_or(false, |set| set.contains(&precedent))
    }

    /// Breadth-first walk over the transitive dependents of `start`
    ///
    /// `visit` is called once per reachable cell (not `start` itself unless a cycle
    /// leads back to it); returning `false` stops the walk from expanding past that cell.
    pub fn walk_dependents<F>(&self, start: CellAddress, mut visit: F)
    where
        F: FnMut(CellAddress) -> bool,
    {
        let mut seen = AHashSet::new();
        let mut queue: VecDeque<CellAddress> = self.dependents(start).collect();

        while let Some(cell) = queue.pop_front() {
            if !seen.insert(cell) {
                continue;
            }
            if visit(cell) {
                queue.extend(self.dependents(cell));
            }
        }
    }

    /// Find a member of `precedents` that already depends on `cell`, directly or
    /// transitively (including `cell` itself)
    pub fn find_cycle(
        &self,
        cell: CellAddress,
        precedents: &BTreeSet<CellAddress>,
    ) -> Option<CellAddress> {
        if precedents.contains(&cell) {
            return Some(cell);
        }

        let mut found = None;
        self.walk_dependents(cell, |dependent| {
            if precedents.contains(&dependent) {
                found = Some(dependent);
            }
            found.is_none()
        });
        found
    }

    /// Number of edges
    pub fn edge_count(&self) -> usize {
        self.precedents.values().map(|set| set.len()).sum()
    }

    /// Check if the graph has no edges
    pub fn is_empty(&self) -> bool {
        self.precedents.is_empty()
    }
}
