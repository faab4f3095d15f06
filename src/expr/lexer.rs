//! Tokenizer for pipeline expressions.
//!
//! Uses the logos lexer generator. Atoms are either bare runs of bytes up to
//! the next delimiter (whitespace, parenthesis or double quote) or
//! double-quoted strings with backslash escapes.

use std::fmt;

use logos::Logos;

/// Lexer error kinds.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum LexError {
    /// A character that cannot start any token, such as a lone `"`.
    #[default]
    UnexpectedCharacter,
    /// A backslash escape other than `\"`, `\\`, `\n` or `\t`.
    InvalidEscape(char),
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedCharacter => f.write_str("unexpected character or unterminated string"),
            Self::InvalidEscape(ch) => write!(f, "invalid escape sequence \\{ch}"),
        }
    }
}

/// Tokens of the expression language.
#[derive(Logos, Clone, Debug, Eq, PartialEq)]
#[logos(error = LexError)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum Token {
    /// `(`
    #[token("(")]
    Open,
    /// `)`
    #[token(")")]
    Close,
    /// A double-quoted atom with escapes resolved.
    #[regex(r#""([^"\\]|\\.)*""#, unquote)]
    Quoted(String),
    /// A bare atom.
    #[regex(r#"[^ \t\r\n\f()"]+"#, |lex| lex.slice().to_owned())]
    Bare(String),
}

fn unquote(lex: &mut logos::Lexer<'_, Token>) -> Result<String, LexError> {
    let slice = lex.slice();
    let inner = slice
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .ok_or(LexError::UnexpectedCharacter)?;

    let mut value = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            value.push(ch);
            continue;
        }
        match chars.next() {
            Some('"') => value.push('"'),
            Some('\\') => value.push('\\'),
            Some('n') => value.push('\n'),
            Some('t') => value.push('\t'),
            Some(other) => return Err(LexError::InvalidEscape(other)),
            None => return Err(LexError::UnexpectedCharacter),
        }
    }
    Ok(value)
}
