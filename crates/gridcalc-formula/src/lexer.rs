//! Formula lexer
//!
//! Splits formula text into a flat token sequence terminated by a single
//! [`TokenKind::Eof`] token. Whitespace separates tokens and is otherwise dropped; any
//! other character that cannot start a token is an error rather than being skipped.
//!
//! A `ref : ref` sequence is collapsed into one [`TokenKind::CellRange`] token as soon as
//! the second reference is scanned, so the parser never sees a range colon.

use crate::error::LexicalError;
use std::fmt;

/// Token categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Literals
    Number,
    Text,
    Boolean,

    // Identifiers and references
    Identifier,
    CellRef,
    CellRange,

    // Arithmetic
    Plus,
    Minus,
    Star,
    Slash,
    Caret,

    // Comparison
    Equal,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,

    // Punctuation
    LeftParen,
    RightParen,
    Comma,
    Colon,

    // End of input
    Eof,
}

/// A lexed token
///
/// `text` is the source slice the token was scanned from (quotes included for text
/// literals), except for collapsed ranges, whose text is `start:end`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// Byte offset of the token's first character
    pub position: usize,
}

impl Token {
    /// Human-readable form for error messages
    pub fn describe(&self) -> &str {
        match self.kind {
            TokenKind::Eof => "end of input",
            _ => &self.text,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.describe())
    }
}

/// Tokenize formula text
///
/// # Example
/// ```rust
/// use gridcalc_formula::lexer::{tokenize, TokenKind};
///
/// let tokens = tokenize("SUM(A1:B2)").unwrap();
/// let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
/// assert_eq!(
///     kinds,
///     vec![
///         TokenKind::Identifier,
///         TokenKind::LeftParen,
///         TokenKind::CellRange,
///         TokenKind::RightParen,
///         TokenKind::Eof,
///     ]
/// );
/// ```
pub fn tokenize(input: &str) -> Result<Vec<Token>, LexicalError> {
    Lexer::new(input).tokenize()
}

/// Single-use formula lexer
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            tokens: Vec::new(),
        }
    }

    /// Consume the lexer and produce the token sequence
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexicalError> {
        loop {
            self.skip_whitespace();
            if self.is_at_end() {
                break;
            }
            self.scan_token()?;
        }

        self.tokens.push(Token {
            kind: TokenKind::Eof,
            text: String::new(),
            position: self.pos,
        });
        Ok(self.tokens)
    }

    // === Token scanning ===

    fn scan_token(&mut self) -> Result<(), LexicalError> {
        let start = self.pos;
        let Some(c) = self.peek_char() else {
            return Ok(());
        };

        // Single-character tokens
        let single = match c {
            '(' => Some(TokenKind::LeftParen),
            ')' => Some(TokenKind::RightParen),
            ',' => Some(TokenKind::Comma),
            ':' => Some(TokenKind::Colon),
            '+' => Some(TokenKind::Plus),
            '-' => Some(TokenKind::Minus),
            '*' => Some(TokenKind::Star),
            '/' => Some(TokenKind::Slash),
            '^' => Some(TokenKind::Caret),
            '=' => Some(TokenKind::Equal),
            _ => None,
        };
        if let Some(kind) = single {
            self.advance();
            self.push(kind, start);
            return Ok(());
        }

        match c {
            '<' | '>' => {
                self.advance();
                let kind = match (c, self.peek_char() == Some('=')) {
                    ('<', true) => TokenKind::LessEqual,
                    ('<', false) => TokenKind::Less,
                    (_, true) => TokenKind::GreaterEqual,
                    (_, false) => TokenKind::Greater,
                };
                if matches!(kind, TokenKind::LessEqual | TokenKind::GreaterEqual) {
                    self.advance();
                }
                self.push(kind, start);
                Ok(())
            }
            '"' | '\'' => self.scan_string(c),
            c if c.is_ascii_digit() => {
                self.scan_number();
                Ok(())
            }
            c if c.is_ascii_alphabetic() => {
                self.scan_word();
                Ok(())
            }
            ch => Err(LexicalError::UnexpectedCharacter {
                ch,
                position: start,
            }),
        }
    }

    fn scan_string(&mut self, quote: char) -> Result<(), LexicalError> {
        let start = self.pos;
        self.advance(); // Skip opening quote

        loop {
            match self.peek_char() {
                None => return Err(LexicalError::UnterminatedString { position: start }),
                Some(c) if c == quote => {
                    self.advance();
                    // A doubled quote is an escaped quote, not the end
                    if self.peek_char() == Some(quote) {
                        self.advance();
                    } else {
                        break;
                    }
                }
                Some(_) => self.advance(),
            }
        }

        self.push(TokenKind::Text, start);
        Ok(())
    }

    fn scan_number(&mut self) {
        let start = self.pos;
        self.skip_digits();

        // Decimal part, only when a digit follows the point
        if self.peek_char() == Some('.')
            && self.peek_char_at(1).map_or(false, |c| c.is_ascii_digit())
        {
            self.advance();
            self.skip_digits();
        }

        self.push(TokenKind::Number, start);
    }

    fn scan_word(&mut self) {
        let start = self.pos;
        while self.peek_char().map_or(false, |c| c.is_ascii_alphabetic()) {
            self.advance();
        }

        if self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
            self.skip_digits();
            self.push_reference(start);
            return;
        }

        let word = &self.input[start..self.pos];
        let kind = if word.eq_ignore_ascii_case("true") || word.eq_ignore_ascii_case("false") {
            TokenKind::Boolean
        } else {
            TokenKind::Identifier
        };
        self.push(kind, start);
    }

    /// Push a cell reference, collapsing it with a preceding `ref :` into a range
    fn push_reference(&mut self, start: usize) {
        let collapses = matches!(
            self.tokens.as_slice(),
            [.., prev, colon] if prev.kind == TokenKind::CellRef && colon.kind == TokenKind::Colon
        );

        if collapses {
            self.tokens.pop(); // ':'
            if let Some(range_start) = self.tokens.pop() {
                self.tokens.push(Token {
                    kind: TokenKind::CellRange,
                    text: format!("{}:{}", range_start.text, &self.input[start..self.pos]),
                    position: range_start.position,
                });
                return;
            }
        }

        self.push(TokenKind::CellRef, start);
    }

    fn push(&mut self, kind: TokenKind, start: usize) {
        self.tokens.push(Token {
            kind,
            text: self.input[start..self.pos].to_string(),
            position: start,
        });
    }

    // === Helper methods ===

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(offset)
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_digits(&mut self) {
        while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
            self.advance();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().map_or(false, |c| c.is_whitespace()) {
            self.advance();
        }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.input.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).unwrap().iter().map(|t| t.kind).collect()
    }

    fn texts(input: &str) -> Vec<String> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|t| t.text)
            .collect()
    }

    #[test]
    fn test_empty_input_is_just_eof() {
        assert_eq!(kinds(""), vec![TokenKind::Eof]);
        assert_eq!(kinds("   \t"), vec![TokenKind::Eof]);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(texts("42 3.14"), vec!["42", "3.14", ""]);
        assert_eq!(kinds("7"), vec![TokenKind::Number, TokenKind::Eof]);
    }

    #[test]
    fn test_number_without_fraction_digits() {
        assert_eq!(
            tokenize("1."),
            Err(LexicalError::UnexpectedCharacter {
                ch: '.',
                position: 1
            })
        );
        assert!(tokenize(".5").is_err());
    }

    #[test]
    fn test_no_exponent_notation() {
        // `1e5` is a number followed by a cell reference
        assert_eq!(
            kinds("1e5"),
            vec![TokenKind::Number, TokenKind::CellRef, TokenKind::Eof]
        );
    }

    #[test]
    fn test_operators_and_punctuation() {
        assert_eq!(
            kinds("( ) , : + - * / ^ = < > <= >="),
            vec![
                TokenKind::LeftParen,
                TokenKind::RightParen,
                TokenKind::Comma,
                TokenKind::Colon,
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::Star,
                TokenKind::Slash,
                TokenKind::Caret,
                TokenKind::Equal,
                TokenKind::Less,
                TokenKind::Greater,
                TokenKind::LessEqual,
                TokenKind::GreaterEqual,
                TokenKind::Eof,
            ]
        );
        assert_eq!(texts("1<=2"), vec!["1", "<=", "2", ""]);
    }

    #[test]
    fn test_identifiers_and_keywords() {
        assert_eq!(
            kinds("sum TRUE False iF"),
            vec![
                TokenKind::Identifier,
                TokenKind::Boolean,
                TokenKind::Boolean,
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_cell_references() {
        let tokens = tokenize("AB12 + a1").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::CellRef);
        assert_eq!(tokens[0].text, "AB12");
        assert_eq!(tokens[2].kind, TokenKind::CellRef);
        assert_eq!(tokens[2].text, "a1");
    }

    #[test]
    fn test_letters_then_digits_form_one_reference() {
        // A keyword directly followed by digits is a reference, not a keyword and a number
        assert_eq!(texts("TRUE0"), vec!["TRUE0", ""]);
        assert_eq!(kinds("TRUE0")[0], TokenKind::CellRef);
        assert!(tokenize("TRUE0.5").is_err());

        assert_eq!(
            kinds("TRUE 0.5"),
            vec![TokenKind::Boolean, TokenKind::Number, TokenKind::Eof]
        );
    }

    #[test]
    fn test_range_collapsing() {
        let tokens = tokenize("A1:B3").unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].kind, TokenKind::CellRange);
        assert_eq!(tokens[0].text, "A1:B3");
        assert_eq!(tokens[0].position, 0);

        // Whitespace around the colon does not matter
        let tokens = tokenize("SUM(A1 : A3)").unwrap();
        assert_eq!(tokens[2].kind, TokenKind::CellRange);
        assert_eq!(tokens[2].text, "A1:A3");
        assert_eq!(tokens[2].position, 4);
    }

    #[test]
    fn test_colon_without_range_stays_a_colon() {
        assert_eq!(
            kinds("1:A1"),
            vec![
                TokenKind::Number,
                TokenKind::Colon,
                TokenKind::CellRef,
                TokenKind::Eof
            ]
        );
        // A range followed by another `: ref` does not chain
        assert_eq!(
            kinds("A1:B2:C3"),
            vec![
                TokenKind::CellRange,
                TokenKind::Colon,
                TokenKind::CellRef,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_strings() {
        let tokens = tokenize("\"hello world\" 'single'").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Text);
        assert_eq!(tokens[0].text, "\"hello world\"");
        assert_eq!(tokens[1].kind, TokenKind::Text);
        assert_eq!(tokens[1].text, "'single'");

        // The other quote character does not close a string
        let tokens = tokenize("\"it's\"").unwrap();
        assert_eq!(tokens[0].text, "\"it's\"");

        // Doubled quotes are escapes
        let tokens = tokenize("\"say \"\"hi\"\"\"").unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].text, "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_unterminated_string() {
        assert_eq!(
            tokenize("1 + \"abc"),
            Err(LexicalError::UnterminatedString { position: 4 })
        );
        assert_eq!(
            tokenize("'abc\""),
            Err(LexicalError::UnterminatedString { position: 0 })
        );
    }

    #[test]
    fn test_unexpected_character() {
        assert_eq!(
            tokenize("1 & 2"),
            Err(LexicalError::UnexpectedCharacter {
                ch: '&',
                position: 2
            })
        );
        assert!(tokenize("$A$1").is_err());
        assert!(tokenize("50%").is_err());
        assert!(tokenize("é").is_err());
    }

    #[test]
    fn test_lexers_do_not_share_state() {
        let first = tokenize("A1:A2").unwrap();
        let second = tokenize("B1").unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 2);
        assert_eq!(second[0].kind, TokenKind::CellRef);
    }

    fn token_shape() -> impl Strategy<Value = String> {
        prop_oneof![
            (0u32..10_000).prop_map(|n| n.to_string()),
            (0u32..1000, 0u32..100).prop_map(|(i, f)| format!("{i}.{f}")),
            "[a-z0-9 ]{0,6}".prop_map(|s| format!("\"{s}\"")),
            "[a-z0-9 ]{0,6}".prop_map(|s| format!("'{s}'")),
            Just("TRUE".to_string()),
            Just("false".to_string()),
            "[A-Z]{1,3}".prop_map(|s| s),
            ("[A-Z]{1,2}", 1u32..500).prop_map(|(c, r)| format!("{c}{r}")),
            Just("A1:B2".to_string()),
            prop::sample::select(vec![
                "(", ")", ",", ":", "+", "-", "*", "/", "^", "=", "<", ">", "<=", ">="
            ])
            .prop_map(str::to_string),
        ]
    }

    fn strip_whitespace(s: &str) -> String {
        s.chars().filter(|c| !c.is_whitespace()).collect()
    }

    proptest! {
        #[test]
        fn prop_token_texts_reproduce_input(
            parts in prop::collection::vec(
                (token_shape(), prop::sample::select(vec![" ", "  ", "\t"])),
                0..12
            )
        ) {
            // Shapes glued together can merge into other tokens (`TRUE` then `0.5`
            // reads as the reference `TRUE0`), so every shape is followed by whitespace
            let input: String = parts
                .iter()
                .map(|(text, separator)| format!("{text}{separator}"))
                .collect();

            let tokens = tokenize(&input).unwrap();
            prop_assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::Eof));
            prop_assert_eq!(
                tokens.iter().filter(|t| t.kind == TokenKind::Eof).count(),
                1
            );

            let rebuilt: String = tokens.iter().map(|t| t.text.as_str()).collect();
            prop_assert_eq!(strip_whitespace(&rebuilt), strip_whitespace(&input));
        }
    }
}
