//! Hand-rolled cursor over a single N-Quad line.

use super::ParseError;
use crate::{Quad, QuadObject};

struct Cursor<'a> {
    s: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(s: &'a str) -> Self {
        Self { s, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.s[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.s.len()
    }

    fn rest(&self) -> &'a str {
        &self.s[self.pos..]
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(' ' | '\t')) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, want: char, expected: &'static str) -> Result<(), ParseError> {
        match self.peek() {
            Some(c) if c == want => {
                self.pos += c.len_utf8();
                Ok(())
            }
            Some(found) => Err(ParseError::UnexpectedChar {
                pos: self.pos,
                found,
                expected,
            }),
            None => Err(ParseError::UnexpectedEnd { expected }),
        }
    }

    /// `<...>` → contents without brackets.
    fn iri(&mut self, term: &'static str) -> Result<String, ParseError> {
        let start = self.pos;
        self.expect('<', term)?;
        let Some(len) = self.rest().find('>') else {
            return Err(ParseError::UnterminatedIri { pos: start });
        };
        let body = &self.rest()[..len];
        if body.is_empty() {
            return Err(ParseError::EmptyTerm { term, pos: start });
        }
        if let Some((off, c)) = body.char_indices().find(|(_, c)| c.is_whitespace()) {
            return Err(ParseError::UnexpectedChar {
                pos: self.pos + off,
                found: c,
                expected: "'>'",
            });
        }
        self.pos += len + 1;
        Ok(body.to_string())
    }

    /// `_:label` → `_:label`. A '.' glued to the end belongs to the statement terminator.
    fn blank(&mut self, term: &'static str) -> Result<String, ParseError> {
        let start = self.pos;
        if !self.rest().starts_with("_:") {
            return match self.peek() {
                Some(found) => Err(ParseError::UnexpectedChar {
                    pos: self.pos,
                    found,
                    expected: term,
                }),
                None => Err(ParseError::UnexpectedEnd { expected: term }),
            };
        }
        self.pos += 2;
        let len = self
            .rest()
            .find([' ', '\t'])
            .unwrap_or(self.rest().len());
        let mut label = &self.rest()[..len];
        if let Some(stripped) = label.strip_suffix('.') {
            label = stripped;
        }
        if label.is_empty() {
            return Err(ParseError::EmptyTerm { term, pos: start });
        }
        self.pos += label.len();
        Ok(format!("_:{label}"))
    }

    /// IRI or blank node, chosen by the first character.
    fn node(&mut self, term: &'static str) -> Result<String, ParseError> {
        match self.peek() {
            Some('<') => self.iri(term),
            Some('_') => self.blank(term),
            Some(found) => Err(ParseError::UnexpectedChar {
                pos: self.pos,
                found,
                expected: term,
            }),
            None => Err(ParseError::UnexpectedEnd { expected: term }),
        }
    }

    fn hex_escape(&mut self, digits: usize, at: usize) -> Result<char, ParseError> {
        let rest = self.rest();
        let hex = rest.get(..digits).ok_or(ParseError::InvalidEscape { pos: at })?;
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ParseError::InvalidEscape { pos: at });
        }
        let code = u32::from_str_radix(hex, 16).map_err(|_| ParseError::InvalidEscape { pos: at })?;
        let c = char::from_u32(code).ok_or(ParseError::InvalidEscape { pos: at })?;
        self.pos += digits;
        Ok(c)
    }

    /// `"..."` with escapes resolved.
    fn literal(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        self.expect('"', "'\"'")?;
        let mut out = String::new();
        loop {
            let at = self.pos;
            match self.bump() {
                None => return Err(ParseError::UnterminatedLiteral { pos: start }),
                Some('"') => return Ok(out),
                Some('\\') => {
                    let c = match self.bump() {
                        Some('t') => '\t',
                        Some('b') => '\u{8}',
                        Some('n') => '\n',
                        Some('r') => '\r',
                        Some('f') => '\u{c}',
                        Some('"') => '"',
                        Some('\'') => '\'',
                        Some('\\') => '\\',
                        Some('u') => self.hex_escape(4, at)?,
                        Some('U') => self.hex_escape(8, at)?,
                        None => return Err(ParseError::UnterminatedLiteral { pos: start }),
                        Some(_) => return Err(ParseError::InvalidEscape { pos: at }),
                    };
                    out.push(c);
                }
                Some(c) => out.push(c),
            }
        }
    }

    fn language(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        self.expect('@', "'@'")?;
        let len = self
            .rest()
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
            .unwrap_or(self.rest().len());
        if len == 0 {
            return Err(ParseError::EmptyTerm {
                term: "language tag",
                pos: start,
            });
        }
        let tag = self.rest()[..len].to_string();
        self.pos += len;
        Ok(tag)
    }
}

/// Decode one N-Quad line: `subject predicate object [label] .`
///
/// Leading and trailing spaces, tabs and `\r` are ignored. IRIs come back without brackets;
/// blank nodes keep their `_:` prefix so they never collide with IRIs.
pub fn parse_line(line: &str) -> Result<Quad, ParseError> {
    let line = line.trim_matches([' ', '\t', '\r']);
    if line.is_empty() {
        return Err(ParseError::Empty);
    }
    let mut cur = Cursor::new(line);

    let subject = cur.node("subject")?;
    cur.skip_ws();
    let predicate = cur.iri("predicate")?;
    cur.skip_ws();

    let mut language = None;
    let mut datatype = None;
    let object = match cur.peek() {
        Some('"') => {
            let value = cur.literal()?;
            if cur.peek() == Some('@') {
                language = Some(cur.language()?);
            } else if cur.rest().starts_with("^^") {
                cur.pos += 2;
                datatype = Some(cur.iri("datatype")?);
            }
            QuadObject::Value(value)
        }
        _ => QuadObject::Id(cur.node("object")?),
    };
    cur.skip_ws();

    let label = match cur.peek() {
        Some('.') | None => None,
        _ => {
            let l = cur.node("label")?;
            cur.skip_ws();
            Some(l)
        }
    };
    cur.expect('.', "'.'")?;
    cur.skip_ws();
    if !cur.at_end() {
        return Err(ParseError::TrailingInput { pos: cur.pos });
    }

    Ok(Quad {
        subject,
        predicate,
        object,
        language,
        datatype,
        label,
    })
}
