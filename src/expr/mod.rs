//! Parse tree for pipeline expressions.
//!
//! Expressions are parenthesised forms such as
//! `(if-one-target (external ssh) (external-parallel ssh))`. A [`Form`] is
//! either an atom or an ordered list of forms. [`parse`] turns source text into
//! exactly one root form and [`Form`]'s `Display` renders it back into text
//! that parses to the same tree.

use std::fmt;

use logos::Logos;
use thiserror::Error;

mod lexer;

use lexer::{LexError, Token};

/// Parsed unit of the expression language.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Form {
    /// Literal text, symbol or command word.
    Atom(String),
    /// Ordered, possibly empty, list of forms.
    List(Vec<Form>),
}

impl Form {
    /// Convenience constructor for an atom.
    #[must_use]
    pub fn atom(value: impl Into<String>) -> Self {
        Self::Atom(value.into())
    }

    /// Returns the atom text, or `None` for a list.
    #[must_use]
    pub fn as_atom(&self) -> Option<&str> {
        match self {
            Self::Atom(value) => Some(value),
            Self::List(_) => None,
        }
    }
}

impl fmt::Display for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Atom(value) => write_atom(f, value),
            Self::List(items) => {
                f.write_str("(")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(")")
            }
        }
    }
}

fn write_atom(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
    let needs_quotes = value.is_empty()
        || value
            .chars()
            .any(|ch| ch.is_whitespace() || matches!(ch, '(' | ')' | '"' | '\\'));
    if !needs_quotes {
        return f.write_str(value);
    }

    f.write_str("\"")?;
    for ch in value.chars() {
        match ch {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            other => write!(f, "{other}")?,
        }
    }
    f.write_str("\"")
}

/// Errors raised while parsing expression text.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ParseError {
    /// Raised when the input contains no form at all.
    #[error("expression is empty")]
    Empty,
    /// Raised on a `)` without a matching `(`.
    #[error("unbalanced ')' at offset {offset}")]
    UnexpectedClose {
        /// Byte offset of the stray parenthesis.
        offset: usize,
    },
    /// Raised when input ends inside a list.
    #[error("list opened at offset {offset} is never closed")]
    UnclosedList {
        /// Byte offset of the opening parenthesis.
        offset: usize,
    },
    /// Raised when an atom cannot be tokenized.
    #[error("malformed atom at offset {offset}: {reason}")]
    MalformedAtom {
        /// Byte offset where tokenizing failed.
        offset: usize,
        /// Description of the lexer failure.
        reason: String,
    },
    /// Raised when more input follows the root form.
    #[error("unexpected input after the expression at offset {offset}")]
    TrailingInput {
        /// Byte offset of the first extra token.
        offset: usize,
    },
}

/// Parses `source` into exactly one root form.
///
/// # Errors
///
/// Returns [`ParseError`] when parentheses are unbalanced, an atom is
/// malformed, the input is empty or more than one root form is present.
pub fn parse(source: &str) -> Result<Form, ParseError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens: &tokens,
        position: 0,
    };
    let root = parser.form()?.ok_or(ParseError::Empty)?;
    if let Some((_, offset)) = parser.peek() {
        return Err(ParseError::TrailingInput { offset });
    }
    Ok(root)
}

fn tokenize(source: &str) -> Result<Vec<(Token, usize)>, ParseError> {
    Token::lexer(source)
        .spanned()
        .map(|(token, span)| {
            token
                .map(|value| (value, span.start))
                .map_err(|err: LexError| ParseError::MalformedAtom {
                    offset: span.start,
                    reason: err.to_string(),
                })
        })
        .collect()
}

struct Parser<'a> {
    tokens: &'a [(Token, usize)],
    position: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<(&'a Token, usize)> {
        self.tokens
            .get(self.position)
            .map(|(token, offset)| (token, *offset))
    }

    fn advance(&mut self) -> Option<(&'a Token, usize)> {
        let next = self
            .tokens
            .get(self.position)
            .map(|(token, offset)| (token, *offset));
        if next.is_some() {
            self.position += 1;
        }
        next
    }

    /// Reads one form; `Ok(None)` means the input is exhausted.
    fn form(&mut self) -> Result<Option<Form>, ParseError> {
        let Some((token, offset)) = self.advance() else {
            return Ok(None);
        };
        match token {
            Token::Quoted(value) | Token::Bare(value) => Ok(Some(Form::Atom(value.clone()))),
            Token::Close => Err(ParseError::UnexpectedClose { offset }),
            Token::Open => self.list(offset).map(Some),
        }
    }

    fn list(&mut self, opened_at: usize) -> Result<Form, ParseError> {
        let mut items = Vec::new();
        loop {
            match self.peek() {
                None => return Err(ParseError::UnclosedList { offset: opened_at }),
                Some((Token::Close, _)) => {
                    self.position += 1;
                    return Ok(Form::List(items));
                }
                Some(_) => {
                    let item = self
                        .form()?
                        .ok_or(ParseError::UnclosedList { offset: opened_at })?;
                    items.push(item);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests;
