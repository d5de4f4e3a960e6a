//! Cell value types

use std::fmt;

/// A scalar value held by a cell or produced by a formula
///
/// Evaluation failures are values too ([`Value::Error`]): they are cached like any other
/// result and flow through dependent formulas.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    /// Empty cell (no value)
    #[default]
    Empty,

    /// Numeric value
    Number(f64),

    /// Boolean value (TRUE/FALSE)
    Boolean(bool),

    /// Text value
    Text(String),

    /// Error value (#VALUE!, #REF!, etc.)
    Error(ErrorKind),
}

impl Value {
    /// Create a new text value
    pub fn text<S: Into<String>>(s: S) -> Self {
        Value::Text(s.into())
    }

    /// Check if the value is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    /// Check if the value is an error
    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    /// Get the error if this is one
    pub fn error(&self) -> Option<ErrorKind> {
        match self {
            Value::Error(e) => Some(*e),
            _ => None,
        }
    }

    /// Get the number if this is one
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => Ok(()),
            Value::Number(n) => write!(f, "{}", n),
            Value::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Value::Text(s) => write!(f, "{}", s),
            Value::Error(e) => write!(f, "{}", e),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::text(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<ErrorKind> for Value {
    fn from(e: ErrorKind) -> Self {
        Value::Error(e)
    }
}

/// Evaluation errors, carried as values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorKind {
    /// #NAME? - Function name not found in the function library
    UnknownFunction,
    /// #ARGS! - Argument count outside the function's arity
    Arity,
    /// #VALUE! - Wrong type of operand or argument
    Type,
    /// #DIV/0! - Division by zero
    DivisionByZero,
    /// #REF! - Reference outside the grid
    UnresolvedReference,
    /// #NUM! - Arithmetic result is not a finite number
    Numeric,
}

impl ErrorKind {
    /// Get the display string for this error
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::UnknownFunction => "#NAME?",
            ErrorKind::Arity => "#ARGS!",
            ErrorKind::Type => "#VALUE!",
            ErrorKind::DivisionByZero => "#DIV/0!",
            ErrorKind::UnresolvedReference => "#REF!",
            ErrorKind::Numeric => "#NUM!",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
