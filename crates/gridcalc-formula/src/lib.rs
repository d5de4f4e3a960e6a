//! # gridcalc-formula
//!
//! Formula language and dependency tracking for gridcalc.
//!
//! This crate provides:
//! - Lexing and parsing (text → tokens → AST)
//! - Evaluation (AST → value), with errors carried as values
//! - The built-in function library (logical and aggregate functions), open to extension
//! - The dependency graph used for cycle rejection and invalidation
//!
//! ## Example
//!
//! ```rust
//! use gridcalc_formula::{evaluate, parse_formula, EvaluationContext};
//! use gridcalc_core::Value;
//!
//! let ast = parse_formula("IF(2 + 3 * 4 > 10, SUM(1, 2), 0)").unwrap();
//! let result = evaluate(&ast, &EvaluationContext::simple());
//! assert_eq!(result, Value::Number(3.0));
//! ```

pub mod ast;
pub mod dependency;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod lexer;
pub mod parser;

pub use ast::{BinaryOperator, FormulaExpr, Reference, UnaryOperator};
pub use dependency::{extract_precedents, DependencyGraph};
pub use error::{CircularReference, FormulaError, FormulaResult, LexicalError, SyntaxError};
pub use evaluator::{
    evaluate, Argument, CellResolver, EvaluationContext, TextTruthiness, DEFAULT_MAX_RANGE_CELLS,
};
pub use functions::{builtin_functions, FunctionDef, FunctionImpl, FunctionRegistry};
pub use lexer::{tokenize, Token, TokenKind};
pub use parser::{parse_formula, MAX_DEPTH};
