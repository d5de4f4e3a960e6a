//! Formula error types
//!
//! Only lexing and parsing fail as Rust errors. Everything that can go wrong while
//! evaluating a formula is an [`ErrorKind`](gridcalc_core::ErrorKind) value instead.

use gridcalc_core::CellAddress;
use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Errors that reject formula text before it is installed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormulaError {
    /// The text could not be split into tokens
    #[error("Lexical error: {0}")]
    Lexical(#[from] LexicalError),

    /// The tokens do not form an expression
    #[error("Syntax error: {0}")]
    Syntax(#[from] SyntaxError),
}

/// Errors raised by the lexer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexicalError {
    /// A character that starts no token
    #[error("unexpected character '{ch}' at offset {position}")]
    UnexpectedCharacter { ch: char, position: usize },

    /// A string literal without its closing quote
    #[error("unterminated string starting at offset {position}")]
    UnterminatedString { position: usize },
}

/// Errors raised by the parser
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxError {
    /// A call's argument list is not closed by ')'
    #[error("missing ')' to close call to {name}, found '{found}'")]
    UnclosedCall { name: String, found: String },

    /// A function name that is not followed by '('
    #[error("expected '(' after function name {name}")]
    MissingOpenParen { name: String },

    /// No literal, reference or call where an operand is required
    #[error("expected a value, found '{found}'")]
    ExpectedPrimary { found: String },

    /// Input left over after a complete expression
    #[error("unexpected '{found}' after end of expression")]
    TrailingTokens { found: String },

    /// A parenthesised group is not closed by ')'
    #[error("missing ')' to close group, found '{found}'")]
    UnclosedGroup { found: String },

    /// A reference-shaped token that names no valid cell (e.g. `A0`)
    #[error("invalid cell reference '{reference}'")]
    InvalidReference { reference: String },

    /// Operators, groups or calls nested past the parser's limit
    #[error("formula nests deeper than {limit} levels")]
    TooDeep { limit: usize },
}

/// A precedent set that would close a loop in the dependency graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("circular reference: {cell} cannot depend on {precedent}, which already depends on {cell}")]
pub struct CircularReference {
    /// The cell whose precedents were being replaced
    pub cell: CellAddress,
    /// The precedent that reaches back to `cell`
    pub precedent: CellAddress,
}
