//! Thread-safe sheet handle
//!
//! Reads write to the cache as a side effect, so every operation, reads included, takes
//! the same exclusive lock over the whole sheet.

use crate::calculation::CalculationStats;
use crate::error::Result;
use crate::sheet::Sheet;
use gridcalc_core::{CellAddress, Value};
use gridcalc_formula::FunctionDef;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;

/// A sheet shared between threads
///
/// Cloning the handle shares the sheet.
#[derive(Debug, Clone)]
pub struct SharedSheet {
    inner: Arc<Mutex<Sheet>>,
}

impl SharedSheet {
    /// Wrap a sheet for sharing
    pub fn new(sheet: Sheet) -> Self {
        Self {
            inner: Arc::new(Mutex::new(sheet)),
        }
    }

    /// Run a closure with exclusive access to the sheet
    pub fn with<R>(&self, f: impl FnOnce(&mut Sheet) -> R) -> R {
        f(&mut *self.inner.lock())
    }

    pub fn set_formula(&self, address: CellAddress, source: &str) -> Result<()> {
        self.inner.lock().set_formula(address, source)
    }

    pub fn set_literal(&self, address: CellAddress, value: Value) -> Result<()> {
        self.inner.lock().set_literal(address, value)
    }

    pub fn set_input(&self, address: &str, input: &str) -> Result<()> {
        self.inner.lock().set_input(address, input)
    }

    pub fn clear_cell(&self, address: CellAddress) -> Result<()> {
        self.inner.lock().clear_cell(address)
    }

    pub fn calculate(&self, address: CellAddress) -> Result<Value> {
        self.inner.lock().calculate(address)
    }

    pub fn value(&self, address: &str) -> Result<Value> {
        self.inner.lock().value(address)
    }

    pub fn calculate_all(&self) -> CalculationStats {
        self.inner.lock().calculate_all()
    }

    pub fn register_function(&self, def: FunctionDef) {
        self.inner.lock().register_function(def)
    }

    pub fn precedents_of(&self, address: CellAddress) -> BTreeSet<CellAddress> {
        self.inner.lock().precedents_of(address)
    }

    pub fn dependents_of(&self, address: CellAddress) -> BTreeSet<CellAddress> {
        self.inner.lock().dependents_of(address)
    }

    pub fn stats(&self) -> CalculationStats {
        self.inner.lock().stats()
    }
}

impl From<Sheet> for SharedSheet {
    fn from(sheet: Sheet) -> Self {
        Self::new(sheet)
    }
}
