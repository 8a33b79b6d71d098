//! Lexer for C headers and C++ sources
//!
//! Converts source text into the token stream shared by the declaration
//! parser, the Ham parser and the structure scraper. Comments and
//! preprocessor directives are skipped.

use crate::frontend::token::{Token, TokenKind};
use crate::utils::Span;

/// The lexer state
pub struct Lexer {
    /// Source code as chars
    source: Vec<char>,
    /// Current position in source
    pos: usize,
    /// Start position of current token
    start: usize,
    /// Current line (1-based)
    line: usize,
    /// Line of the current token start
    start_line: usize,
}

impl Lexer {
    /// Create a new lexer; `first_line` is the line number of the first char
    pub fn new(source: &str, first_line: usize) -> Self {
        Self {
            source: source.chars().collect(),
            pos: 0,
            start: 0,
            line: first_line,
            start_line: first_line,
        }
    }

    /// Get the current character without advancing
    fn peek(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    /// Get the next character without advancing
    fn peek_next(&self) -> Option<char> {
        self.source.get(self.pos + 1).copied()
    }

    /// Advance to the next character
    fn advance(&mut self) -> Option<char> {
        let c = self.peek();
        if c == Some('\n') {
            self.line += 1;
        }
        self.pos += 1;
        c
    }

    /// Check if we've reached the end of input
    fn is_at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    /// True when only whitespace precedes `pos` on its line
    fn at_line_start(&self) -> bool {
        self.source[..self.pos.min(self.source.len())]
            .iter()
            .rev()
            .take_while(|&&c| c != '\n')
            .all(|c| c.is_whitespace())
    }

    /// Create a span from start to current position
    fn make_span(&self) -> Span {
        Span::new(self.start, self.pos, self.start_line)
    }

    /// Create a token with the current span
    fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(kind, self.make_span())
    }

    /// Source text covered by a span
    pub fn slice(&self, span: Span) -> String {
        let end = span.end.min(self.source.len());
        let start = span.start.min(end);
        self.source[start..end].iter().collect()
    }

    /// Skip whitespace, comments and preprocessor lines
    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            match c {
                ' ' | '\t' | '\r' | '\n' => {
                    self.advance();
                }
                // Line comment
                '/' if self.peek_next() == Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                // Block comment (C comments do not nest)
                '/' if self.peek_next() == Some('*') => {
                    self.advance();
                    self.advance();
                    while !self.is_at_end() {
                        if self.peek() == Some('*') && self.peek_next() == Some('/') {
                            self.advance();
                            self.advance();
                            break;
                        }
                        self.advance();
                    }
                }
                // Preprocessor directive, honouring line continuations
                '#' if self.at_line_start() => {
                    while let Some(c) = self.peek() {
                        if c == '\\' && self.peek_next() == Some('\n') {
                            self.advance();
                            self.advance();
                            continue;
                        }
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    /// Read an identifier
    fn read_identifier(&mut self) -> Token {
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }

        let text: String = self.source[self.start..self.pos].iter().collect();
        self.make_token(TokenKind::Ident(text))
    }

    /// Read a number literal; suffixes and hex digits are kept in the raw text
    fn read_number(&mut self) -> Token {
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '.' {
                self.advance();
            } else {
                break;
            }
        }

        let text: String = self.source[self.start..self.pos].iter().collect();
        self.make_token(TokenKind::Number(text))
    }

    /// Read a string literal
    fn read_string(&mut self) -> Token {
        self.advance(); // opening quote
        let mut value = String::new();

        while let Some(c) = self.peek() {
            match c {
                '"' => {
                    self.advance();
                    break;
                }
                '\\' => {
                    self.advance();
                    match self.advance() {
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        Some(other) => value.push(other),
                        None => break,
                    }
                }
                '\n' => break,
                _ => {
                    value.push(c);
                    self.advance();
                }
            }
        }

        self.make_token(TokenKind::StringLit(value))
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();
        self.start = self.pos;
        self.start_line = self.line;

        let Some(c) = self.peek() else {
            return Token::eof(self.make_span());
        };

        if c.is_alphabetic() || c == '_' {
            return self.read_identifier();
        }
        if c.is_ascii_digit() {
            return self.read_number();
        }
        if c == '"' {
            return self.read_string();
        }

        self.advance();
        let kind = match c {
            '*' => TokenKind::Star,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            '=' => TokenKind::Eq,
            '.' if self.peek() == Some('.') && self.peek_next() == Some('.') => {
                self.advance();
                self.advance();
                TokenKind::Ellipsis
            }
            other => TokenKind::Other(other),
        };
        self.make_token(kind)
    }

    /// Tokenize the entire source; the last token is always `Eof`
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }
}
