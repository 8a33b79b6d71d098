//! Token definitions for the restricted C grammar

use std::fmt;

use crate::utils::Span;

/// A token produced by the lexer
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn eof(span: Span) -> Self {
        Self { kind: TokenKind::Eof, span }
    }

    /// Identifier text, if this token is one
    pub fn ident(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Ident(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_ident(&self, text: &str) -> bool {
        self.ident() == Some(text)
    }
}

/// Token kinds
///
/// Only the punctuation the declaration and Ham grammars care about gets a
/// dedicated kind; everything else is carried through as `Other`.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // ============ Literals ============
    /// identifier or keyword (C keywords are not distinguished)
    Ident(String),
    /// integer or float literal, raw text
    Number(String),
    /// "string literal", unescaped contents
    StringLit(String),

    // ============ Punctuation ============
    /// *
    Star,
    /// (
    LParen,
    /// )
    RParen,
    /// {
    LBrace,
    /// }
    RBrace,
    /// [
    LBracket,
    /// ]
    RBracket,
    /// ,
    Comma,
    /// ;
    Semicolon,
    /// =
    Eq,
    /// ...
    Ellipsis,
    /// any other single character
    Other(char),

    Eof,
}

impl TokenKind {
    /// Parse an integer literal (decimal or hex, C suffixes ignored)
    pub fn as_int(&self) -> Option<i64> {
        let TokenKind::Number(text) = self else {
            return None;
        };
        let trimmed = text.trim_end_matches(|c: char| matches!(c, 'u' | 'U' | 'l' | 'L'));
        if let Some(hex) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
            i64::from_str_radix(hex, 16).ok()
        } else {
            trimmed.parse().ok()
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Ident(name) => write!(f, "identifier `{}`", name),
            TokenKind::Number(text) => write!(f, "number `{}`", text),
            TokenKind::StringLit(text) => write!(f, "string \"{}\"", text),
            TokenKind::Star => write!(f, "`*`"),
            TokenKind::LParen => write!(f, "`(`"),
            TokenKind::RParen => write!(f, "`)`"),
            TokenKind::LBrace => write!(f, "`{{`"),
            TokenKind::RBrace => write!(f, "`}}`"),
            TokenKind::LBracket => write!(f, "`[`"),
            TokenKind::RBracket => write!(f, "`]`"),
            TokenKind::Comma => write!(f, "`,`"),
            TokenKind::Semicolon => write!(f, "`;`"),
            TokenKind::Eq => write!(f, "`=`"),
            TokenKind::Ellipsis => write!(f, "`...`"),
            TokenKind::Other(c) => write!(f, "`{}`", c),
            TokenKind::Eof => write!(f, "end of input"),
        }
    }
}
