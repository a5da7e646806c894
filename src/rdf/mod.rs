//! N-Quad line decoding: one line in, one [`Quad`](crate::Quad) or [`ParseError`] out.

mod parser;

pub use parser::parse_line;

use thiserror::Error;

/// Why a line could not be decoded. Positions are byte offsets into the trimmed line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty line")]
    Empty,
    #[error("unexpected end of line, expected {expected}")]
    UnexpectedEnd { expected: &'static str },
    #[error("unexpected {found:?} at {pos}, expected {expected}")]
    UnexpectedChar {
        pos: usize,
        found: char,
        expected: &'static str,
    },
    #[error("unterminated IRI starting at {pos}")]
    UnterminatedIri { pos: usize },
    #[error("unterminated literal starting at {pos}")]
    UnterminatedLiteral { pos: usize },
    #[error("invalid escape sequence at {pos}")]
    InvalidEscape { pos: usize },
    #[error("empty {term} at {pos}")]
    EmptyTerm { term: &'static str, pos: usize },
    #[error("trailing input after terminating '.' at {pos}")]
    TrailingInput { pos: usize },
}

/// Returns true for lines that carry no statement (blank or `#` comment).
pub fn is_skippable(line: &str) -> bool {
    let t = line.trim();
    t.is_empty() || t.starts_with('#')
}
