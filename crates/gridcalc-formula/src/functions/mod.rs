//! Built-in functions

pub mod logical;
pub mod math;

use crate::ast::FormulaExpr;
use crate::evaluator::{Argument, EvaluationContext};
use ahash::AHashMap;
use gridcalc_core::Value;
use std::fmt;
use std::sync::OnceLock;

/// Signature of a function that receives its arguments already evaluated
///
/// Scalar error arguments never reach the body: the evaluator returns the first one
/// instead. Errors inside range arguments are left to the function.
pub type EagerFn = fn(&[Argument], &EvaluationContext) -> Value;

/// Signature of a function that evaluates its own arguments (e.g. `IF`)
pub type LazyFn = fn(&[FormulaExpr], &EvaluationContext) -> Value;

/// Function implementation
#[derive(Clone, Copy)]
pub enum FunctionImpl {
    Eager(EagerFn),
    Lazy(LazyFn),
}

/// Function definition
#[derive(Clone)]
pub struct FunctionDef {
    /// Function name (matched case-insensitively)
    pub name: &'static str,
    /// Minimum arguments
    pub min_args: usize,
    /// Maximum arguments (None = unlimited)
    pub max_args: Option<usize>,
    /// Implementation
    pub implementation: FunctionImpl,
}

impl FunctionDef {
    /// Check whether a call with `count` arguments is within this function's arity
    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min_args && self.max_args.map_or(true, |max| count <= max)
    }
}

impl fmt::Debug for FunctionDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.implementation {
            FunctionImpl::Eager(_) => "eager",
            FunctionImpl::Lazy(_) => "lazy",
        };
        f.debug_struct("FunctionDef")
            .field("name", &self.name)
            .field("min_args", &self.min_args)
            .field("max_args", &self.max_args)
            .field("implementation", &kind)
            .finish()
    }
}

/// Global registry of the built-in functions (lazily initialized)
static BUILTIN_FUNCTIONS: OnceLock<FunctionRegistry> = OnceLock::new();

/// Get the shared registry of built-in functions
pub fn builtin_functions() -> &'static FunctionRegistry {
    BUILTIN_FUNCTIONS.get_or_init(FunctionRegistry::new)
}

/// Function registry
#[derive(Clone, Debug)]
pub struct FunctionRegistry {
    functions: AHashMap<String, FunctionDef>,
}

impl FunctionRegistry {
    /// Create a new registry with all built-in functions
    pub fn new() -> Self {
        let mut registry = Self::empty();

        registry.register_logical_functions();
        registry.register_math_functions();

        registry
    }

    /// Create a registry with no functions
    pub fn empty() -> Self {
        Self {
            functions: AHashMap::new(),
        }
    }

    /// Look up a function by name
    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(&name.to_uppercase())
    }

    /// Check whether a function is registered
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Register a function, returning the definition it replaces
    pub fn register(&mut self, def: FunctionDef) -> Option<FunctionDef> {
        self.functions.insert(def.name.to_uppercase(), def)
    }

    /// Registered function names (uppercase, sorted)
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered functions
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Check if no functions are registered
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    fn register_logical_functions(&mut self) {
        // AND
        self.register(FunctionDef {
            name: "AND",
            min_args: 1,
            max_args: None,
            implementation: FunctionImpl::Eager(logical::fn_and),
        });

        // OR
        self.register(FunctionDef {
            name: "OR",
            min_args: 1,
            max_args: None,
            implementation: FunctionImpl::Eager(logical::fn_or),
        });

        // NOT
        self.register(FunctionDef {
            name: "NOT",
            min_args: 1,
            max_args: Some(1),
            implementation: FunctionImpl::Eager(logical::fn_not),
        });

        // IF (only the selected branch is evaluated)
        self.register(FunctionDef {
            name: "IF",
            min_args: 2,
            max_args: Some(3),
            implementation: FunctionImpl::Lazy(logical::fn_if),
        });
    }

    fn register_math_functions(&mut self) {
        // SUM
        self.register(FunctionDef {
            name: "SUM",
            min_args: 1,
            max_args: None,
            implementation: FunctionImpl::Eager(math::fn_sum),
        });

        // AVERAGE
        self.register(FunctionDef {
            name: "AVERAGE",
            min_args: 1,
            max_args: None,
            implementation: FunctionImpl::Eager(math::fn_average),
        });

        // MIN
        self.register(FunctionDef {
            name: "MIN",
            min_args: 1,
            max_args: None,
            implementation: FunctionImpl::Eager(math::fn_min),
        });

        // MAX
        self.register(FunctionDef {
            name: "MAX",
            min_args: 1,
            max_args: None,
            implementation: FunctionImpl::Eager(math::fn_max),
        });

        // COUNT
        self.register(FunctionDef {
            name: "COUNT",
            min_args: 1,
            max_args: None,
            implementation: FunctionImpl::Eager(math::fn_count),
        });

        // ABS
        self.register(FunctionDef {
            name: "ABS",
            min_args: 1,
            max_args: Some(1),
            implementation: FunctionImpl::Eager(math::fn_abs),
        });
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
