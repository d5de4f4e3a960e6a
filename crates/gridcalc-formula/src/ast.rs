//! Formula Abstract Syntax Tree types

use gridcalc_core::{CellAddress, CellRange, Value};
use std::fmt;

/// Formula expression AST
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaExpr {
    /// Number, text or boolean literal
    Literal(Value),

    // === References ===
    /// Single cell reference
    CellRef(CellAddress),
    /// Rectangular range reference
    CellRange(CellRange),

    // === Operators ===
    /// Unary operation
    UnaryOp {
        op: UnaryOperator,
        operand: Box<FormulaExpr>,
    },
    /// Binary operation
    BinaryOp {
        op: BinaryOperator,
        left: Box<FormulaExpr>,
        right: Box<FormulaExpr>,
    },

    // === Function call ===
    /// Function call; `name` is stored uppercase
    Call { name: String, args: Vec<FormulaExpr> },
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,

    // Comparison
    Equal,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

impl BinaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Power => "^",
            BinaryOperator::Equal => "=",
            BinaryOperator::Less => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::Greater => ">",
            BinaryOperator::GreaterEqual => ">=",
        }
    }

    /// Check if this operator compares rather than computes
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOperator::Equal
                | BinaryOperator::Less
                | BinaryOperator::LessEqual
                | BinaryOperator::Greater
                | BinaryOperator::GreaterEqual
        )
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    Negate,
    Plus,
}

/// A reference appearing in a formula
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reference {
    Cell(CellAddress),
    Range(CellRange),
}

impl FormulaExpr {
    /// Build a literal node
    pub fn literal(value: impl Into<Value>) -> Self {
        FormulaExpr::Literal(value.into())
    }

    /// Collect every reference in the tree, in source order
    ///
    /// Both branches of an `IF` are included: the set describes what the formula may read,
    /// not what a particular evaluation reads.
    pub fn references(&self) -> Vec<Reference> {
        let mut refs = Vec::new();
        self.collect_references(&mut refs);
        refs
    }

    fn collect_references(&self, refs: &mut Vec<Reference>) {
        match self {
            FormulaExpr::Literal(_) => {}
            FormulaExpr::CellRef(addr) => refs.push(Reference::Cell(*addr)),
            FormulaExpr::CellRange(range) => refs.push(Reference::Range(*range)),
            FormulaExpr::UnaryOp { operand, .. } => operand.collect_references(refs),
            FormulaExpr::BinaryOp { left, right, .. } => {
                left.collect_references(refs);
                right.collect_references(refs);
            }
            FormulaExpr::Call { args, .. } => {
                for arg in args {
                    arg.collect_references(refs);
                }
            }
        }
    }
}

/// Canonical rendering: every operation is parenthesised, references use A1 notation
impl fmt::Display for FormulaExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormulaExpr::Literal(Value::Text(s)) => write!(f, "\"{}\"", s.replace('"', "\"\"")),
            FormulaExpr::Literal(value) => write!(f, "{}", value),
            FormulaExpr::CellRef(addr) => write!(f, "{}", addr),
            FormulaExpr::CellRange(range) => write!(f, "{}", range),
            FormulaExpr::UnaryOp { op, operand } => {
                let symbol = match op {
                    UnaryOperator::Negate => "-",
                    UnaryOperator::Plus => "+",
                };
                write!(f, "({}{})", symbol, operand)
            }
            FormulaExpr::BinaryOp { op, left, right } => {
                write!(f, "({}{}{})", left, op.symbol(), right)
            }
            FormulaExpr::Call { name, args } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}
