//! Brace/whitespace tokenizer for BVH text.
//!
//! Tokens are `{`, `}` or a maximal run of characters that are neither whitespace nor
//! braces. Numbers are parsed on demand so the parser decides what each word means.

use crate::error::{ParseError, ParseErrorKind};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Token<'a> {
    OpenBrace,
    CloseBrace,
    Word(&'a str),
}

impl<'a> Token<'a> {
    pub fn as_str(&self) -> &'a str {
        match self {
            Token::OpenBrace => "{",
            Token::CloseBrace => "}",
            Token::Word(w) => *w,
        }
    }
}

/// A token with its 1-based line and byte offset.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Spanned<'a> {
    pub token: Token<'a>,
    pub line: usize,
    pub offset: usize,
}

#[derive(Clone, Debug)]
pub struct Tokenizer<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
    peeked: Option<Spanned<'a>>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            line: 1,
            peeked: None,
        }
    }

    /// Rewind to the start of the input.
    pub fn restart(&mut self) {
        self.pos = 0;
        self.line = 1;
        self.peeked = None;
    }

    /// Bytes not yet consumed, including any peeked token.
    pub fn remaining(&self) -> usize {
        let pos = self.peeked.map_or(self.pos, |s| s.offset);
        self.src.len() - pos
    }

    /// Line and offset of the next unread position; used for end-of-input errors.
    pub fn position(&self) -> (usize, usize) {
        match &self.peeked {
            Some(s) => (s.line, s.offset),
            None => (self.line, self.pos),
        }
    }

    pub fn peek(&mut self) -> Option<Spanned<'a>> {
        if self.peeked.is_none() {
            self.peeked = self.scan();
        }
        self.peeked
    }

    pub fn next_token(&mut self) -> Option<Spanned<'a>> {
        match self.peeked.take() {
            Some(tok) => Some(tok),
            None => self.scan(),
        }
    }

    fn scan(&mut self) -> Option<Spanned<'a>> {
        let rest = &self.src[self.pos..];
        let mut start = None;
        for (i, ch) in rest.char_indices() {
            if ch == '\n' {
                self.line += 1;
            } else if !ch.is_whitespace() {
                start = Some(i);
                break;
            }
        }
        let Some(start) = start else {
            self.pos = self.src.len();
            return None;
        };
        let offset = self.pos + start;
        let tail = &self.src[offset..];
        let (token, len) = if tail.starts_with('{') {
            (Token::OpenBrace, 1)
        } else if tail.starts_with('}') {
            (Token::CloseBrace, 1)
        } else {
            let len = tail
                .find(|c: char| c.is_whitespace() || c == '{' || c == '}')
                .unwrap_or(tail.len());
            (Token::Word(&tail[..len]), len)
        };
        self.pos = offset + len;
        Some(Spanned {
            token,
            line: self.line,
            offset,
        })
    }

    fn eof(&self, expected: &str) -> ParseError {
        let (line, offset) = self.position();
        ParseError::new(
            line,
            offset,
            ParseErrorKind::UnexpectedEof {
                expected: expected.to_string(),
            },
        )
    }

    /// Next token, or an end-of-input error naming what was expected.
    pub fn require(&mut self, expected: &str) -> Result<Spanned<'a>, ParseError> {
        self.next_token().ok_or_else(|| self.eof(expected))
    }

    /// Consume a word token equal to `word`.
    pub fn expect_word(&mut self, word: &str) -> Result<Spanned<'a>, ParseError> {
        let tok = self.require(&format!("'{word}'"))?;
        match tok.token {
            Token::Word(w) if w == word => Ok(tok),
            other => Err(unexpected(&tok, &format!("'{word}'"), other.as_str())),
        }
    }

    pub fn expect_open(&mut self) -> Result<Spanned<'a>, ParseError> {
        let tok = self.require("'{'")?;
        match tok.token {
            Token::OpenBrace => Ok(tok),
            other => Err(unexpected(&tok, "'{'", other.as_str())),
        }
    }

    /// Consume any word token (a joint name, for instance).
    pub fn next_word(&mut self, expected: &str) -> Result<Spanned<'a>, ParseError> {
        let tok = self.require(expected)?;
        match tok.token {
            Token::Word(_) => Ok(tok),
            other => Err(unexpected(&tok, expected, other.as_str())),
        }
    }

    pub fn next_float(&mut self) -> Result<f32, ParseError> {
        let tok = self.require("a number")?;
        parse_float(&tok)
    }

    pub fn next_usize(&mut self) -> Result<usize, ParseError> {
        let tok = self.require("an integer")?;
        let text = tok.token.as_str();
        text.parse::<usize>().map_err(|_| {
            ParseError::new(
                tok.line,
                tok.offset,
                ParseErrorKind::InvalidNumber {
                    token: text.to_string(),
                },
            )
        })
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Spanned<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}

pub(crate) fn parse_float(tok: &Spanned<'_>) -> Result<f32, ParseError> {
    let text = tok.token.as_str();
    match text.parse::<f32>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(ParseError::new(
            tok.line,
            tok.offset,
            ParseErrorKind::InvalidNumber {
                token: text.to_string(),
            },
        )),
    }
}

pub(crate) fn unexpected(tok: &Spanned<'_>, expected: &str, found: &str) -> ParseError {
    ParseError::new(
        tok.line,
        tok.offset,
        ParseErrorKind::UnexpectedToken {
            expected: expected.to_string(),
            found: found.to_string(),
        },
    )
}
