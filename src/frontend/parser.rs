//! Declaration parser
//!
//! Parses one `RET (*NAME)(ARG, ...)` line from an SDK function table into a
//! [`Function`]. The grammar is deliberately narrow: anything it does not
//! understand degrades into an opaque pointer argument or, for the outer
//! shape, into an unparsable stand-in. Parsing a line never fails.

use log::warn;

use crate::frontend::ast::{Argument, Function};
use crate::frontend::lexer::Lexer;
use crate::frontend::token::{Token, TokenKind};
use crate::utils::{Error, Result, Span};

/// Words that can end a type but never name a parameter
const TYPE_WORDS: &[&str] = &[
    "int", "char", "short", "long", "float", "double", "signed", "unsigned", "void",
];

/// Words that only qualify the type that follows them
const QUALIFIERS: &[&str] = &["const", "struct", "enum", "unsigned", "signed", "volatile"];

/// Collapse runs of spaces and tabs into single spaces
pub fn collapse_whitespace(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse a declaration line. Unparsable lines yield a `NULL` stand-in.
pub fn parse_declaration(line: &str, line_no: usize) -> Function {
    let pretty = collapse_whitespace(line);
    let mut parser = Parser::new(&pretty, line_no);
    match parser.parse_function(line) {
        Ok(function) => function,
        Err(err) => {
            warn!("line {}: {} in `{}`", line_no, err, pretty);
            let name = parser
                .fallback_name()
                .unwrap_or_else(|| format!("unknown{}", line_no));
            Function::unparsable(name, line, Span::at_line(line_no))
        }
    }
}

/// The parser
pub struct Parser {
    lexer: Lexer,
    tokens: Vec<Token>,
    pos: usize,
    line: usize,
}

impl Parser {
    /// Create a parser over one collapsed declaration line
    pub fn new(source: &str, line: usize) -> Self {
        let mut lexer = Lexer::new(source, line);
        let tokens = lexer.tokenize();
        Self {
            lexer,
            tokens,
            pos: 0,
            line,
        }
    }

    // ==================== Helper Methods ====================

    fn current(&self) -> &Token {
        // tokenize() always ends with Eof, so the last token is a safe fallback
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.pos.min(last)]
    }

    fn current_kind(&self) -> &TokenKind {
        &self.current().kind
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.current_kind()) == std::mem::discriminant(kind)
    }

    fn expect(&mut self, expected: TokenKind) -> Result<Token> {
        if self.check(&expected) {
            Ok(self.advance())
        } else {
            Err(Error::UnexpectedToken {
                expected: expected.to_string(),
                got: self.current_kind().to_string(),
                span: self.current().span,
            })
        }
    }

    fn expect_ident(&mut self) -> Result<String> {
        match self.current_kind() {
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            other => Err(Error::UnexpectedToken {
                expected: "identifier".to_string(),
                got: other.to_string(),
                span: self.current().span,
            }),
        }
    }

    /// Source text between two tokens (inclusive)
    fn text(&self, first: &Token, last: &Token) -> String {
        self.lexer
            .slice(Span::new(first.span.start, last.span.end, first.span.line))
            .trim()
            .to_string()
    }

    /// Best-effort `(*NAME)` search used for degraded entries
    fn fallback_name(&self) -> Option<String> {
        self.tokens.windows(4).find_map(|w| match (&w[0].kind, &w[1].kind, &w[2].kind, &w[3].kind) {
            (TokenKind::LParen, TokenKind::Star, TokenKind::Ident(name), TokenKind::RParen) => {
                Some(name.clone())
            }
            _ => None,
        })
    }

    // ==================== Parsing Methods ====================

    /// Parse `RET (*NAME)(ARGS)`; anything after the argument list is ignored
    pub fn parse_function(&mut self, original: &str) -> Result<Function> {
        let ret_start = self.pos;
        while matches!(self.current_kind(), TokenKind::Ident(_) | TokenKind::Star) {
            self.advance();
        }
        if self.pos == ret_start {
            return Err(Error::MalformedDeclaration {
                reason: "missing return type".to_string(),
                span: self.current().span,
            });
        }
        let return_type = self.text(&self.tokens[ret_start], &self.tokens[self.pos - 1]);

        self.expect(TokenKind::LParen)?;
        self.expect(TokenKind::Star)?;
        let name = self.expect_ident()?;
        self.expect(TokenKind::RParen)?;
        let open = self.expect(TokenKind::LParen)?;

        let chunks = self.split_arguments(&open)?;
        let args = chunks
            .iter()
            .filter(|chunk| !(chunk.len() == 1 && chunk[0].is_ident("void")))
            .enumerate()
            .map(|(index, chunk)| self.parse_argument(index, chunk))
            .collect();

        Ok(Function {
            name,
            return_type,
            args,
            original: original.to_string(),
            span: Span::at_line(self.line),
        })
    }

    /// Collect the argument list up to the matching `)`, split on top-level commas
    fn split_arguments(&mut self, open: &Token) -> Result<Vec<Vec<Token>>> {
        let mut chunks = Vec::new();
        let mut current = Vec::new();
        let mut depth = 0usize;

        loop {
            let token = self.advance();
            match token.kind {
                TokenKind::Eof => {
                    return Err(Error::MalformedDeclaration {
                        reason: "unbalanced parentheses in argument list".to_string(),
                        span: open.span,
                    });
                }
                TokenKind::LParen => {
                    depth += 1;
                    current.push(token);
                }
                TokenKind::RParen if depth == 0 => break,
                TokenKind::RParen => {
                    depth -= 1;
                    current.push(token);
                }
                TokenKind::Comma if depth == 0 => chunks.push(std::mem::take(&mut current)),
                _ => current.push(token),
            }
        }

        if !current.is_empty() || !chunks.is_empty() {
            chunks.push(current);
        }
        Ok(chunks)
    }

    /// Classify one argument chunk
    fn parse_argument(&self, index: usize, chunk: &[Token]) -> Argument {
        let placeholder = format!("value{}", index);
        let (Some(first), Some(last)) = (chunk.first(), chunk.last()) else {
            return Argument::new(placeholder, "void*");
        };

        if chunk.len() == 1 && first.kind == TokenKind::Ellipsis {
            return Argument::variadic();
        }

        // Function-pointer parameter: `void (*fn)(void)` or `void (*)(void)`
        if let Some(star) = chunk
            .windows(2)
            .position(|w| w[0].kind == TokenKind::LParen && w[1].kind == TokenKind::Star)
        {
            let name = match (chunk.get(star + 2), chunk.get(star + 3)) {
                (Some(ident), Some(close)) if close.kind == TokenKind::RParen => {
                    ident.ident().map(str::to_string)
                }
                _ => None,
            };
            return Argument::new(name.unwrap_or_else(|| format!("callback{}", index)), "void*");
        }

        // `name[N]` decays to a pointer
        if let [prefix @ .., name, open, size, close] = chunk {
            if open.kind == TokenKind::LBracket && close.kind == TokenKind::RBracket {
                if let (Some(name), Some(size), Some(type_end)) =
                    (name.ident(), size.kind.as_int(), prefix.last())
                {
                    if Self::is_type_run(prefix) {
                        let mut arg = Argument::new(name, format!("{}*", self.text(first, type_end)));
                        arg.size = usize::try_from(size).ok();
                        return arg;
                    }
                }
            }
        }

        if !Self::is_type_run(chunk) {
            return Argument::new(placeholder, "void*");
        }

        // A bare type: one word with at most one trailing star
        let stars = chunk.iter().filter(|t| t.kind == TokenKind::Star).count();
        if chunk.len() - stars == 1 && stars <= 1 && first.ident().is_some() {
            return Argument::new(placeholder, self.text(first, last));
        }

        match last.ident() {
            Some(name) if !TYPE_WORDS.contains(&name) && !Self::only_qualifiers(&chunk[..chunk.len() - 1]) => {
                let type_end = &chunk[chunk.len() - 2];
                Argument::new(name, self.text(first, type_end))
            }
            // Trailing star, trailing type word, or `struct foo`: unnamed
            _ => Argument::new(placeholder, self.text(first, last)),
        }
    }

    /// Only identifiers and stars
    fn is_type_run(tokens: &[Token]) -> bool {
        !tokens.is_empty()
            && tokens
                .iter()
                .all(|t| matches!(t.kind, TokenKind::Ident(_) | TokenKind::Star))
    }

    fn only_qualifiers(tokens: &[Token]) -> bool {
        tokens
            .iter()
            .all(|t| t.ident().map_or(false, |w| QUALIFIERS.contains(&w)))
    }
}
