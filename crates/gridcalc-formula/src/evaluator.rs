//! Formula evaluator
//!
//! Evaluates formula ASTs to produce values. Evaluation never fails as a Rust error:
//! every failure is a [`Value::Error`] that flows through the rest of the expression.

use crate::ast::{BinaryOperator, FormulaExpr, UnaryOperator};
use crate::functions::{builtin_functions, FunctionImpl, FunctionRegistry};
use gridcalc_core::{CellAddress, CellRange, Dimensions, ErrorKind, Value};
use std::cmp::Ordering;

/// Default limit on the number of cells a single range may expand to
pub const DEFAULT_MAX_RANGE_CELLS: u64 = 1_000_000;

/// Source of cell values for reference resolution
///
/// Implementations must return up-to-date values: the evaluator reads whatever
/// `value_at` returns without further checks.
pub trait CellResolver {
    /// Bounds of the grid references are resolved against
    fn dimensions(&self) -> Dimensions;

    /// Current value of an in-bounds cell
    fn value_at(&self, addr: CellAddress) -> Value;
}

/// How text is interpreted where a boolean is required
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TextTruthiness {
    /// Only "true"/"false" (any case) are booleans; other text is a type error
    #[default]
    Keyword,
    /// Non-empty text is true, empty text is false
    NonEmpty,
}

/// An evaluated argument to an eager function
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Scalar(Value),
    /// Range elements in row-major order
    Range(Vec<Value>),
}

impl Argument {
    /// Values of this argument: one for a scalar, every element for a range
    pub fn values(&self) -> &[Value] {
        match self {
            Argument::Scalar(value) => std::slice::from_ref(value),
            Argument::Range(values) => values,
        }
    }
}

/// Context for formula evaluation
pub struct EvaluationContext<'a> {
    /// Cell value source; without one every reference is unresolved
    pub resolver: Option<&'a dyn CellResolver>,
    /// Functions callable from formulas
    pub functions: &'a FunctionRegistry,
    /// Text-to-boolean policy
    pub truthiness: TextTruthiness,
    /// Ranges larger than this evaluate to `#REF!`
    pub max_range_cells: u64,
}

impl<'a> EvaluationContext<'a> {
    /// Create a new evaluation context
    pub fn new(resolver: &'a dyn CellResolver, functions: &'a FunctionRegistry) -> Self {
        Self {
            resolver: Some(resolver),
            functions,
            truthiness: TextTruthiness::default(),
            max_range_cells: DEFAULT_MAX_RANGE_CELLS,
        }
    }

    /// Create a simple context without cells (for testing)
    pub fn simple() -> Self {
        Self {
            resolver: None,
            functions: builtin_functions(),
            truthiness: TextTruthiness::default(),
            max_range_cells: DEFAULT_MAX_RANGE_CELLS,
        }
    }

    pub fn with_truthiness(mut self, truthiness: TextTruthiness) -> Self {
        self.truthiness = truthiness;
        self
    }

    pub fn with_max_range_cells(mut self, max_range_cells: u64) -> Self {
        self.max_range_cells = max_range_cells;
        self
    }

    /// Get a cell value, or `#REF!` outside the grid
    pub fn get_cell_value(&self, addr: CellAddress) -> Value {
        match self.resolver {
            Some(resolver) if resolver.dimensions().contains(&addr) => resolver.value_at(addr),
            _ => Value::Error(ErrorKind::UnresolvedReference),
        }
    }

    /// Get the values of a range in row-major order
    pub fn get_range_values(&self, range: &CellRange) -> Result<Vec<Value>, ErrorKind> {
        let resolver = self.resolver.ok_or(ErrorKind::UnresolvedReference)?;

        if !resolver.dimensions().contains_range(range) || range.cell_count() > self.max_range_cells
        {
            return Err(ErrorKind::UnresolvedReference);
        }

        Ok(range.cells().map(|addr| resolver.value_at(addr)).collect())
    }

    /// Interpret a value as a boolean
    pub fn truthy(&self, value: &Value) -> Result<bool, ErrorKind> {
        match value {
            Value::Boolean(b) => Ok(*b),
            Value::Number(n) => Ok(*n != 0.0),
            Value::Empty => Ok(false),
            Value::Error(e) => Err(*e),
            Value::Text(s) => match self.truthiness {
                TextTruthiness::NonEmpty => Ok(!s.is_empty()),
                TextTruthiness::Keyword if s.eq_ignore_ascii_case("true") => Ok(true),
                TextTruthiness::Keyword if s.eq_ignore_ascii_case("false") => Ok(false),
                TextTruthiness::Keyword => Err(ErrorKind::Type),
            },
        }
    }
}

/// Evaluate a formula expression in scalar position
///
/// A bare range is not a scalar and evaluates to `#VALUE!`; ranges are only meaningful
/// as function arguments.
pub fn evaluate(expr: &FormulaExpr, ctx: &EvaluationContext) -> Value {
    match expr {
        FormulaExpr::Literal(value) => finite(value.clone()),

        // === References ===
        FormulaExpr::CellRef(addr) => ctx.get_cell_value(*addr),
        FormulaExpr::CellRange(range) => match ctx.get_range_values(range) {
            Ok(_) => Value::Error(ErrorKind::Type),
            Err(e) => Value::Error(e),
        },

        // === Operators ===
        FormulaExpr::UnaryOp { op, operand } => evaluate_unary_op(*op, operand, ctx),
        FormulaExpr::BinaryOp { op, left, right } => evaluate_binary_op(*op, left, right, ctx),

        // === Functions ===
        FormulaExpr::Call { name, args } => evaluate_function(name, args, ctx),
    }
}

/// Evaluate a function argument, keeping ranges as sequences
pub fn evaluate_argument(expr: &FormulaExpr, ctx: &EvaluationContext) -> Argument {
    match expr {
        FormulaExpr::CellRange(range) => match ctx.get_range_values(range) {
            Ok(values) => Argument::Range(values),
            Err(e) => Argument::Scalar(Value::Error(e)),
        },
        _ => Argument::Scalar(evaluate(expr, ctx)),
    }
}

/// Map non-finite numbers to `#NUM!`
fn finite(value: Value) -> Value {
    match value {
        Value::Number(n) if !n.is_finite() => Value::Error(ErrorKind::Numeric),
        v => v,
    }
}

/// Give an empty operand the neutral value of the other operand's kind
fn fill_empty(value: Value, other: &Value) -> Value {
    match (value, other) {
        (Value::Empty, Value::Text(_)) => Value::text(""),
        (Value::Empty, Value::Boolean(_)) => Value::Boolean(false),
        (Value::Empty, _) => Value::Number(0.0),
        (v, _) => v,
    }
}

/// Evaluate a unary operation
fn evaluate_unary_op(op: UnaryOperator, operand: &FormulaExpr, ctx: &EvaluationContext) -> Value {
    let n = match evaluate(operand, ctx) {
        Value::Number(n) => n,
        Value::Empty => 0.0,
        Value::Error(e) => return Value::Error(e),
        _ => return Value::Error(ErrorKind::Type),
    };

    match op {
        UnaryOperator::Negate => Value::Number(-n),
        UnaryOperator::Plus => Value::Number(n),
    }
}

/// Evaluate a binary operation
fn evaluate_binary_op(
    op: BinaryOperator,
    left: &FormulaExpr,
    right: &FormulaExpr,
    ctx: &EvaluationContext,
) -> Value {
    // Errors short-circuit left to right
    let left_val = evaluate(left, ctx);
    if left_val.is_error() {
        return left_val;
    }
    let right_val = evaluate(right, ctx);
    if right_val.is_error() {
        return right_val;
    }

    let left_val = fill_empty(left_val, &right_val);
    let right_val = fill_empty(right_val, &left_val);

    if op.is_comparison() {
        return compare(op, &left_val, &right_val);
    }

    let (l, r) = match (left_val, right_val) {
        (Value::Number(l), Value::Number(r)) => (l, r),
        _ => return Value::Error(ErrorKind::Type),
    };

    let result = match op {
        BinaryOperator::Add => l + r,
        BinaryOperator::Subtract => l - r,
        BinaryOperator::Multiply => l * r,
        BinaryOperator::Divide => {
            if r == 0.0 {
                return Value::Error(ErrorKind::DivisionByZero);
            }
            l / r
        }
        BinaryOperator::Power => l.powf(r),
        _ => return Value::Error(ErrorKind::Type),
    };

    finite(Value::Number(result))
}

/// Compare two non-error values
///
/// `=` is defined for every pair (different kinds are simply unequal); the ordering
/// operators require both sides to be of the same kind. Text compares case-insensitively.
fn compare(op: BinaryOperator, left: &Value, right: &Value) -> Value {
    let ordering = match (left, right) {
        (Value::Number(l), Value::Number(r)) => l.partial_cmp(r),
        (Value::Text(l), Value::Text(r)) => Some(l.to_lowercase().cmp(&r.to_lowercase())),
        (Value::Boolean(l), Value::Boolean(r)) => Some(l.cmp(r)),
        _ if op == BinaryOperator::Equal => return Value::Boolean(false),
        _ => return Value::Error(ErrorKind::Type),
    };

    let Some(ordering) = ordering else {
        // Only NaN is unordered
        return match op {
            BinaryOperator::Equal => Value::Boolean(false),
            _ => Value::Error(ErrorKind::Numeric),
        };
    };

    let result = match op {
        BinaryOperator::Equal => ordering == Ordering::Equal,
        BinaryOperator::Less => ordering == Ordering::Less,
        BinaryOperator::LessEqual => ordering != Ordering::Greater,
        BinaryOperator::Greater => ordering == Ordering::Greater,
        BinaryOperator::GreaterEqual => ordering != Ordering::Less,
        _ => return Value::Error(ErrorKind::Type),
    };

    Value::Boolean(result)
}

/// Evaluate a function call
fn evaluate_function(name: &str, args: &[FormulaExpr], ctx: &EvaluationContext) -> Value {
    let Some(func) = ctx.functions.get(name) else {
        return Value::Error(ErrorKind::UnknownFunction);
    };

    // Check argument count
    if !func.accepts(args.len()) {
        return Value::Error(ErrorKind::Arity);
    }

    let result = match func.implementation {
        FunctionImpl::Lazy(implementation) => implementation(args, ctx),
        FunctionImpl::Eager(implementation) => {
            // Evaluate arguments left to right, stopping at the first scalar error
            let mut evaluated = Vec::with_capacity(args.len());
            for arg in args {
                let arg = evaluate_argument(arg, ctx);
                if let Argument::Scalar(Value::Error(e)) = arg {
                    return Value::Error(e);
                }
                evaluated.push(arg);
            }
            implementation(&evaluated, ctx)
        }
    };

    finite(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::{FunctionDef, FunctionRegistry};
    use crate::parser::parse_formula;
    use std::cell::Cell;
    use std::collections::HashMap;

    /// Cells held in a map, counting every read
    struct MapResolver {
        dimensions: Dimensions,
        cells: HashMap<CellAddress, Value>,
        reads: Cell<usize>,
    }

    impl MapResolver {
        fn new(cells: &[(&str, Value)]) -> Self {
            Self {
                dimensions: Dimensions::new(10, 5).unwrap(),
                cells: cells
                    .iter()
                    .map(|(a, v)| (CellAddress::parse(a).unwrap(), v.clone()))
                    .collect(),
                reads: Cell::new(0),
            }
        }
    }

    impl CellResolver for MapResolver {
        fn dimensions(&self) -> Dimensions {
            self.dimensions
        }

        fn value_at(&self, addr: CellAddress) -> Value {
            self.reads.set(self.reads.get() + 1);
            self.cells.get(&addr).cloned().unwrap_or_default()
        }
    }

    fn eval(formula: &str) -> Value {
        let ast = parse_formula(formula).unwrap();
        evaluate(&ast, &EvaluationContext::simple())
    }

    fn eval_with(formula: &str, resolver: &MapResolver) -> Value {
        let ast = parse_formula(formula).unwrap();
        let ctx = EvaluationContext::new(resolver, builtin_functions());
        evaluate(&ast, &ctx)
    }

    fn err(kind: ErrorKind) -> Value {
        Value::Error(kind)
    }

    #[test]
    fn test_evaluate_literals() {
        assert_eq!(eval("42"), Value::Number(42.0));
        assert_eq!(eval("\"Hello\""), Value::text("Hello"));
        assert_eq!(eval("TRUE"), Value::Boolean(true));
    }

    #[test]
    fn test_evaluate_arithmetic() {
        assert_eq!(eval("1+2"), Value::Number(3.0));
        assert_eq!(eval("10-3"), Value::Number(7.0));
        assert_eq!(eval("4*5"), Value::Number(20.0));
        assert_eq!(eval("20/4"), Value::Number(5.0));
        assert_eq!(eval("2^10"), Value::Number(1024.0));
    }

    #[test]
    fn test_evaluate_precedence() {
        assert_eq!(eval("2 + 3 * 4"), Value::Number(14.0));
        assert_eq!(eval("(2+3)*4"), Value::Number(20.0));
        // `^` is evaluated left to right with `*` and `/`
        assert_eq!(eval("2 * 3 ^ 2"), Value::Number(36.0));
        assert_eq!(eval("2 ^ 3 ^ 2"), Value::Number(64.0));
        assert_eq!(eval("-2^2"), Value::Number(4.0));
    }

    #[test]
    fn test_evaluate_unary() {
        assert_eq!(eval("-5"), Value::Number(-5.0));
        assert_eq!(eval("--5"), Value::Number(5.0));
        assert_eq!(eval("+5"), Value::Number(5.0));
        assert_eq!(eval("-\"a\""), err(ErrorKind::Type));
        assert_eq!(eval("+TRUE"), err(ErrorKind::Type));
    }

    #[test]
    fn test_arithmetic_requires_numbers() {
        assert_eq!(eval("1+\"2\""), err(ErrorKind::Type));
        assert_eq!(eval("TRUE*2"), err(ErrorKind::Type));
        assert_eq!(eval("\"a\"^2"), err(ErrorKind::Type));
    }

    #[test]
    fn test_evaluate_division_by_zero() {
        assert_eq!(eval("1/0"), err(ErrorKind::DivisionByZero));
        assert_eq!(eval("0/0"), err(ErrorKind::DivisionByZero));
    }

    #[test]
    fn test_non_finite_results() {
        assert_eq!(eval("(0-8)^0.5"), err(ErrorKind::Numeric));
        assert_eq!(eval("10^400"), err(ErrorKind::Numeric));
        assert_eq!(eval("0^(0-1)"), err(ErrorKind::Numeric));

        // A literal too large for a float overflows to infinity when parsed
        let huge = "9".repeat(400);
        assert_eq!(eval(&huge), err(ErrorKind::Numeric));
        assert_eq!(eval(&format!("SUM({huge}, 1)")), err(ErrorKind::Numeric));
        assert_eq!(eval(&format!("IF(FALSE, {huge}, 2)")), Value::Number(2.0));
    }

    #[test]
    fn test_evaluate_comparison() {
        assert_eq!(eval("1<2"), Value::Boolean(true));
        assert_eq!(eval("2<=2"), Value::Boolean(true));
        assert_eq!(eval("3>4"), Value::Boolean(false));
        assert_eq!(eval("3>=4"), Value::Boolean(false));
        assert_eq!(eval("1+1=2"), Value::Boolean(true));
        assert_eq!(eval("\"abc\"<\"ABD\""), Value::Boolean(true));
        assert_eq!(eval("\"Hello\"=\"hello\""), Value::Boolean(true));
        assert_eq!(eval("FALSE<TRUE"), Value::Boolean(true));
    }

    #[test]
    fn test_equality_is_total() {
        assert_eq!(eval("1=\"1\""), Value::Boolean(false));
        assert_eq!(eval("TRUE=1"), Value::Boolean(false));
        assert_eq!(eval("1<\"1\""), err(ErrorKind::Type));
        assert_eq!(eval("TRUE>=0"), err(ErrorKind::Type));
    }

    #[test]
    fn test_errors_short_circuit_left_to_right() {
        assert_eq!(eval("1/0 + NOPE()"), err(ErrorKind::DivisionByZero));
        assert_eq!(eval("NOPE() + 1/0"), err(ErrorKind::UnknownFunction));
        assert_eq!(eval("-(1/0)"), err(ErrorKind::DivisionByZero));
        // Errors win over type mismatches on the other side
        assert_eq!(eval("\"a\" = 1/0"), err(ErrorKind::DivisionByZero));
    }

    #[test]
    fn test_unknown_function_and_arity() {
        assert_eq!(eval("FOO(1)"), err(ErrorKind::UnknownFunction));
        assert_eq!(eval("NOT(TRUE, FALSE)"), err(ErrorKind::Arity));
        assert_eq!(eval("IF(TRUE)"), err(ErrorKind::Arity));
        assert_eq!(eval("SUM()"), err(ErrorKind::Arity));
    }

    #[test]
    fn test_evaluate_if() {
        assert_eq!(eval("IF(TRUE,1,2)"), Value::Number(1.0));
        assert_eq!(eval("if(FALSE,1,2)"), Value::Number(2.0));
        assert_eq!(eval("IF(1>0,\"Yes\",\"No\")"), Value::text("Yes"));
        assert_eq!(eval("IF(FALSE,1)"), Value::Boolean(false));
        assert_eq!(eval("IF(1/0,1,2)"), err(ErrorKind::DivisionByZero));
    }

    #[test]
    fn test_if_only_evaluates_selected_branch() {
        assert_eq!(eval("IF(TRUE, 1, 1/0)"), Value::Number(1.0));
        assert_eq!(eval("IF(FALSE, NOPE(), 2)"), Value::Number(2.0));

        let resolver = MapResolver::new(&[("A1", Value::Number(5.0))]);
        assert_eq!(
            eval_with("IF(TRUE, A1, B1+C1+D1)", &resolver),
            Value::Number(5.0)
        );
        assert_eq!(resolver.reads.get(), 1);

        // References outside the grid only fault when taken
        assert_eq!(eval_with("IF(A1>1, 7, Z99)", &resolver), Value::Number(7.0));
    }

    #[test]
    fn test_eager_functions_propagate_first_error() {
        assert_eq!(eval("SUM(1, 1/0, FOO())"), err(ErrorKind::DivisionByZero));
        assert_eq!(eval("AND(TRUE, FOO())"), err(ErrorKind::UnknownFunction));
        // COUNT ignores non-numbers but not failing arguments
        assert_eq!(eval("COUNT(1, \"a\", TRUE)"), Value::Number(1.0));
        assert_eq!(eval("COUNT(1, 1/0)"), err(ErrorKind::DivisionByZero));
    }

    #[test]
    fn test_evaluate_and_or_not() {
        assert_eq!(eval("AND(TRUE,TRUE)"), Value::Boolean(true));
        assert_eq!(eval("AND(TRUE,FALSE)"), Value::Boolean(false));
        assert_eq!(eval("OR(FALSE,TRUE)"), Value::Boolean(true));
        assert_eq!(eval("NOT(FALSE)"), Value::Boolean(true));
        assert_eq!(eval("AND(1, \"true\")"), Value::Boolean(true));
    }

    #[test]
    fn test_evaluate_nested_functions() {
        assert_eq!(eval("SUM(1,IF(TRUE,10,20),3)"), Value::Number(14.0));
        assert_eq!(eval("IF(AND(1>0,2<3),SUM(1,2,3)*2,0)"), Value::Number(12.0));
        assert_eq!(eval("ABS(MIN(3, -4, 2))"), Value::Number(4.0));
    }

    #[test]
    fn test_cell_references() {
        let resolver = MapResolver::new(&[
            ("A1", Value::Number(10.0)),
            ("A2", Value::text("x")),
            ("A3", Value::Error(ErrorKind::DivisionByZero)),
        ]);
        assert_eq!(eval_with("A1*2", &resolver), Value::Number(20.0));
        assert_eq!(eval_with("A2", &resolver), Value::text("x"));
        assert_eq!(eval_with("A3+1", &resolver), err(ErrorKind::DivisionByZero));
        // Outside the 10x5 grid
        assert_eq!(eval_with("F1", &resolver), err(ErrorKind::UnresolvedReference));
        assert_eq!(eval_with("A11+1", &resolver), err(ErrorKind::UnresolvedReference));
        // No resolver at all
        assert_eq!(eval("A1"), err(ErrorKind::UnresolvedReference));
    }

    #[test]
    fn test_empty_cells_take_neutral_values() {
        let resolver = MapResolver::new(&[("A1", Value::text("a"))]);
        assert_eq!(eval_with("B1", &resolver), Value::Empty);
        assert_eq!(eval_with("B1+2", &resolver), Value::Number(2.0));
        assert_eq!(eval_with("-B1", &resolver), Value::Number(0.0));
        assert_eq!(eval_with("B1=0", &resolver), Value::Boolean(true));
        assert_eq!(eval_with("B1=\"\"", &resolver), Value::Boolean(true));
        assert_eq!(eval_with("B1=FALSE", &resolver), Value::Boolean(true));
        assert_eq!(eval_with("B1=C1", &resolver), Value::Boolean(true));
        assert_eq!(eval_with("B1<A1", &resolver), Value::Boolean(true));
        assert_eq!(eval_with("IF(B1, 1, 2)", &resolver), Value::Number(2.0));
    }

    #[test]
    fn test_range_aggregation() {
        let resolver = MapResolver::new(&[
            ("A1", Value::Number(1.0)),
            ("A2", Value::Number(2.0)),
            ("A3", Value::Number(3.0)),
            ("B1", Value::text("x")),
        ]);
        assert_eq!(eval_with("SUM(A1:A3)", &resolver), Value::Number(6.0));
        assert_eq!(eval_with("AVERAGE(A1:A3)", &resolver), Value::Number(2.0));
        assert_eq!(eval_with("SUM(A1:A3, 10)", &resolver), Value::Number(16.0));
        assert_eq!(eval_with("MAX(A1:A3)", &resolver), Value::Number(3.0));
        assert_eq!(eval_with("COUNT(A1:B3)", &resolver), Value::Number(3.0));
        assert_eq!(
            eval_with("AVERAGE(C1:C5)", &resolver),
            err(ErrorKind::DivisionByZero)
        );
        assert_eq!(eval_with("SUM(A1:B1)", &resolver), err(ErrorKind::Type));
    }

    #[test]
    fn test_range_bounds_and_size() {
        let resolver = MapResolver::new(&[]);
        assert_eq!(
            eval_with("SUM(A1:A11)", &resolver),
            err(ErrorKind::UnresolvedReference)
        );

        let ast = parse_formula("SUM(A1:E10)").unwrap();
        let ctx = EvaluationContext::new(&resolver, builtin_functions()).with_max_range_cells(49);
        assert_eq!(evaluate(&ast, &ctx), err(ErrorKind::UnresolvedReference));
        let ctx = ctx.with_max_range_cells(50);
        assert_eq!(evaluate(&ast, &ctx), Value::Number(0.0));
    }

    #[test]
    fn test_range_in_scalar_position() {
        let resolver = MapResolver::new(&[("A1", Value::Number(1.0))]);
        assert_eq!(eval_with("A1:A3", &resolver), err(ErrorKind::Type));
        assert_eq!(eval_with("A1:A3+1", &resolver), err(ErrorKind::Type));
        assert_eq!(eval_with("ABS(A1:A3)", &resolver), err(ErrorKind::Type));
        assert_eq!(
            eval_with("A1:A30", &resolver),
            err(ErrorKind::UnresolvedReference)
        );
    }

    #[test]
    fn test_custom_registry() {
        fn fn_double(args: &[Argument], _ctx: &EvaluationContext) -> Value {
            match args {
                [Argument::Scalar(Value::Number(n))] => Value::Number(n * 2.0),
                _ => Value::Error(ErrorKind::Type),
            }
        }

        let mut functions = FunctionRegistry::empty();
        functions.register(FunctionDef {
            name: "DOUBLE",
            min_args: 1,
            max_args: Some(1),
            implementation: FunctionImpl::Eager(fn_double),
        });

        let resolver = MapResolver::new(&[]);
        let ctx = EvaluationContext::new(&resolver, &functions);
        let ast = parse_formula("double(21)").unwrap();
        assert_eq!(evaluate(&ast, &ctx), Value::Number(42.0));

        // Built-ins are not implicitly available
        let ast = parse_formula("SUM(1)").unwrap();
        assert_eq!(evaluate(&ast, &ctx), err(ErrorKind::UnknownFunction));
    }
}
