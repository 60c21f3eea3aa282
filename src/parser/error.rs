use super::locations::{Location, Span};
use thiserror::Error;

/// A statement the parser could not make sense of.
///
/// `expected` lists every token the parser would have accepted at the
/// furthest position it reached, sorted for stable output.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("syntax error at {span}: unexpected {found}, expected one of {}", .expected.join(", "))]
pub struct SyntaxError {
    pub span: Span,
    pub found: String,
    pub expected: Vec<String>,
}

impl SyntaxError {
    pub fn new(span: Span, found: &str, expected: Vec<String>) -> Self {
        Self {
            span,
            found: found.to_string(),
            expected,
        }
    }
}

#[derive(Debug, Error)]
pub enum TokenizeError {
    #[error("unexpected character {character:?} at {location}")]
    UnexpectedCharacter { character: char, location: Location },
    #[error("unterminated string starting at {0}")]
    UnterminatedString(Location),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
