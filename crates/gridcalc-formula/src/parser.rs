//! Formula parser
//!
//! A recursive descent parser over the lexer's token stream.
//!
//! Precedence (lowest to highest), every binary level left-associative:
//! 1. Equality: `=`
//! 2. Comparison: `<`, `<=`, `>`, `>=`
//! 3. Additive: `+`, `-`
//! 4. Multiplicative: `*`, `/`, `^`
//! 5. Unary: `-`, `+`
//! 6. Primary: literals, references, function calls, parentheses
//!
//! `^` binds no tighter than `*`: `2*3^2` is `(2*3)^2` and `2^3^2` is `(2^3)^2`.
//!
//! Formulas nesting deeper than [`MAX_DEPTH`] are rejected with [`SyntaxError::TooDeep`].

use crate::ast::{BinaryOperator, FormulaExpr, UnaryOperator};
use crate::error::{FormulaResult, SyntaxError};
use crate::lexer::{tokenize, Token, TokenKind};
use gridcalc_core::{CellAddress, CellRange, Error as AddressError, ErrorKind, Value};

/// Deepest expression tree the parser builds, and deepest nesting of groups and calls
///
/// Evaluating, printing and dropping an expression recurse once per level.
pub const MAX_DEPTH: usize = 256;

/// A parsed expression and the depth of its tree
type Parsed = (FormulaExpr, usize);

/// Parse formula text into an AST
///
/// The text is the formula body alone, without a leading `=`.
///
/// # Example
/// ```rust
/// use gridcalc_formula::parse_formula;
///
/// let ast = parse_formula("1+2").unwrap();
/// let ast = parse_formula("SUM(A1:A10)").unwrap();
/// let ast = parse_formula("IF(A1>0,\"Yes\",\"No\")").unwrap();
/// ```
pub fn parse_formula(formula: &str) -> FormulaResult<FormulaExpr> {
    let tokens = tokenize(formula)?;
    Ok(Parser::new(tokens).parse()?)
}

/// Single-use parser over one token sequence
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// Groups and calls currently open
    open: usize,
}

impl Parser {
    /// Create a parser; a missing end-of-input token is appended
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map(|t| t.kind) != Some(TokenKind::Eof) {
            let position = tokens.last().map_or(0, |t| t.position + t.text.len());
            tokens.push(Token {
                kind: TokenKind::Eof,
                text: String::new(),
                position,
            });
        }
        Self {
            tokens,
            pos: 0,
            open: 0,
        }
    }

    /// Parse one complete expression, rejecting any unconsumed suffix
    pub fn parse(mut self) -> Result<FormulaExpr, SyntaxError> {
        let (expr, _) = self.parse_expression()?;

        if self.current_kind() != TokenKind::Eof {
            return Err(SyntaxError::TrailingTokens {
                found: self.current().describe().to_string(),
            });
        }

        Ok(expr)
    }

    // === Token access ===

    fn current(&self) -> &Token {
        // `new` guarantees a trailing Eof and `consume` never steps past it
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn current_kind(&self) -> TokenKind {
        self.current().kind
    }

    fn consume(&mut self) -> Token {
        let token = self.current().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn found(&self) -> String {
        self.current().describe().to_string()
    }

    fn enter_nested(&mut self) -> Result<(), SyntaxError> {
        if self.open >= MAX_DEPTH {
            return Err(SyntaxError::TooDeep { limit: MAX_DEPTH });
        }
        self.open += 1;
        Ok(())
    }

    fn leave_nested(&mut self) {
        self.open -= 1;
    }

    // === Expression parsing with precedence ===

    fn parse_expression(&mut self) -> Result<Parsed, SyntaxError> {
        self.parse_equality()
    }

    fn parse_equality(&mut self) -> Result<Parsed, SyntaxError> {
        self.parse_binary_level(Self::parse_comparison, |kind| match kind {
            TokenKind::Equal => Some(BinaryOperator::Equal),
            _ => None,
        })
    }

    fn parse_comparison(&mut self) -> Result<Parsed, SyntaxError> {
        self.parse_binary_level(Self::parse_additive, |kind| match kind {
            TokenKind::Less => Some(BinaryOperator::Less),
            TokenKind::LessEqual => Some(BinaryOperator::LessEqual),
            TokenKind::Greater => Some(BinaryOperator::Greater),
            TokenKind::GreaterEqual => Some(BinaryOperator::GreaterEqual),
            _ => None,
        })
    }

    fn parse_additive(&mut self) -> Result<Parsed, SyntaxError> {
        self.parse_binary_level(Self::parse_multiplicative, |kind| match kind {
            TokenKind::Plus => Some(BinaryOperator::Add),
            TokenKind::Minus => Some(BinaryOperator::Subtract),
            _ => None,
        })
    }

    fn parse_multiplicative(&mut self) -> Result<Parsed, SyntaxError> {
        self.parse_binary_level(Self::parse_unary, |kind| match kind {
            TokenKind::Star => Some(BinaryOperator::Multiply),
            TokenKind::Slash => Some(BinaryOperator::Divide),
            TokenKind::Caret => Some(BinaryOperator::Power),
            _ => None,
        })
    }

    /// Fold one left-associative level: `operand (op operand)*`
    fn parse_binary_level(
        &mut self,
        operand: fn(&mut Self) -> Result<Parsed, SyntaxError>,
        operator: fn(TokenKind) -> Option<BinaryOperator>,
    ) -> Result<Parsed, SyntaxError> {
        let (mut left, mut depth) = operand(self)?;

        while let Some(op) = operator(self.current_kind()) {
            self.consume();
            let (right, right_depth) = operand(self)?;
            depth = deeper(depth.max(right_depth))?;
            left = FormulaExpr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok((left, depth))
    }

    fn parse_unary(&mut self) -> Result<Parsed, SyntaxError> {
        let mut ops = Vec::new();
        loop {
            let op = match self.current_kind() {
                TokenKind::Minus => UnaryOperator::Negate,
                TokenKind::Plus => UnaryOperator::Plus,
                _ => break,
            };
            self.consume();
            ops.push(op);
        }

        if ops.len() >= MAX_DEPTH {
            return Err(SyntaxError::TooDeep { limit: MAX_DEPTH });
        }

        let (mut expr, mut depth) = self.parse_primary()?;
        for op in ops.into_iter().rev() {
            depth = deeper(depth)?;
            expr = FormulaExpr::UnaryOp {
                op,
                operand: Box::new(expr),
            };
        }

        Ok((expr, depth))
    }

    fn parse_primary(&mut self) -> Result<Parsed, SyntaxError> {
        match self.current_kind() {
            TokenKind::Number => {
                let token = self.consume();
                let n = token
                    .text
                    .parse::<f64>()
                    .map_err(|_| SyntaxError::ExpectedPrimary { found: token.text })?;
                Ok((FormulaExpr::Literal(Value::Number(n)), 1))
            }

            TokenKind::Text => {
                let token = self.consume();
                Ok((FormulaExpr::Literal(Value::Text(unquote(&token.text))), 1))
            }

            TokenKind::Boolean => {
                let token = self.consume();
                let b = token.text.eq_ignore_ascii_case("true");
                Ok((FormulaExpr::Literal(Value::Boolean(b)), 1))
            }

            TokenKind::CellRef => {
                let token = self.consume();
                let expr = match reference_address(&token.text) {
                    Ok(Some(addr)) => FormulaExpr::CellRef(addr),
                    Ok(None) => unresolved(),
                    Err(()) => {
                        return Err(SyntaxError::InvalidReference {
                            reference: token.text,
                        })
                    }
                };
                Ok((expr, 1))
            }

            TokenKind::CellRange => {
                let token = self.consume();
                let corners = token.text.split_once(':').ok_or(()).and_then(|(start, end)| {
                    Ok((reference_address(start)?, reference_address(end)?))
                });
                let expr = match corners {
                    Ok((Some(start), Some(end))) => {
                        FormulaExpr::CellRange(CellRange::new(start, end))
                    }
                    Ok(_) => unresolved(),
                    Err(()) => {
                        return Err(SyntaxError::InvalidReference {
                            reference: token.text,
                        })
                    }
                };
                Ok((expr, 1))
            }

            TokenKind::Identifier => {
                let token = self.consume();
                self.parse_function_call(token.text)
            }

            TokenKind::LeftParen => {
                self.consume();
                self.enter_nested()?;
                let parsed = self.parse_expression()?;
                if self.current_kind() != TokenKind::RightParen {
                    return Err(SyntaxError::UnclosedGroup { found: self.found() });
                }
                self.consume();
                self.leave_nested();
                Ok(parsed)
            }

            _ => Err(SyntaxError::ExpectedPrimary { found: self.found() }),
        }
    }

    fn parse_function_call(&mut self, name: String) -> Result<Parsed, SyntaxError> {
        let name = name.to_uppercase();

        if self.current_kind() != TokenKind::LeftParen {
            return Err(SyntaxError::MissingOpenParen { name });
        }
        self.consume();
        self.enter_nested()?;

        let mut args = Vec::new();
        let mut depth = 0;

        // Parse arguments
        if self.current_kind() != TokenKind::RightParen {
            loop {
                let (arg, arg_depth) = self.parse_expression()?;
                depth = depth.max(arg_depth);
                args.push(arg);

                if self.current_kind() != TokenKind::Comma {
                    break;
                }
                self.consume();
            }
        }

        if self.current_kind() != TokenKind::RightParen {
            return Err(SyntaxError::UnclosedCall {
                name,
                found: self.found(),
            });
        }
        self.consume();
        self.leave_nested();

        Ok((FormulaExpr::Call { name, args }, deeper(depth)?))
    }
}

/// Depth of a node whose deepest child has the given depth
fn deeper(depth: usize) -> Result<usize, SyntaxError> {
    if depth >= MAX_DEPTH {
        return Err(SyntaxError::TooDeep { limit: MAX_DEPTH });
    }
    Ok(depth + 1)
}

/// Address named by one end of a reference token
///
/// `Ok(None)` for a well-formed address past the sheet limits: it can name no cell, so
/// it reads as `#REF!` like any other reference outside the grid.
fn reference_address(text: &str) -> Result<Option<CellAddress>, ()> {
    match CellAddress::parse(text) {
        Ok(addr) => Ok(Some(addr)),
        Err(AddressError::RowOutOfBounds(..) | AddressError::ColumnOutOfBounds(..)) => Ok(None),
        Err(_) => Err(()),
    }
}

fn unresolved() -> FormulaExpr {
    FormulaExpr::Literal(Value::Error(ErrorKind::UnresolvedReference))
}

/// Strip the surrounding quotes of a text token and undo doubled-quote escapes
fn unquote(raw: &str) -> String {
    let mut chars = raw.chars();
    let Some(quote) = chars.next() else {
        return String::new();
    };
    let inner = chars.as_str();
    let inner = inner.strip_suffix(quote).unwrap_or(inner);

    let mut doubled = String::with_capacity(2);
    doubled.push(quote);
    doubled.push(quote);
    inner.replace(&doubled, &quote.to_string())
}
