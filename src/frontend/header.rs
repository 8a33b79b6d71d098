//! Function table extraction from eiface.h
//!
//! Locates `typedef struct ... { ... } DLL_FUNCTIONS;` (or `enginefuncs_t`)
//! and turns its body into cleaned declaration lines, each tagged with the
//! header line it came from.

use log::warn;

use crate::frontend::ast::{Function, TableId};
use crate::frontend::lexer::Lexer;
use crate::frontend::parser::parse_declaration;
use crate::frontend::token::TokenKind;
use crate::utils::{Error, Result, Span};

/// One cleaned line of a table body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationLine {
    pub text: String,
    pub line: usize,
}

/// The lines of one table body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableSource {
    pub declarations: Vec<DeclarationLine>,
    /// Preprocessor lines dropped from the body
    pub skipped: Vec<DeclarationLine>,
}

/// A parsed table in declaration order
#[derive(Debug, Clone)]
pub struct ParsedTable {
    pub table: TableId,
    pub functions: Vec<Function>,
    pub skipped: Vec<DeclarationLine>,
}

impl ParsedTable {
    pub fn unparsable(&self) -> impl Iterator<Item = &Function> {
        self.functions.iter().filter(|f| f.is_unparsable())
    }
}

/// Extract and parse one table
pub fn parse_table(header: &str, table: TableId) -> Result<ParsedTable> {
    let source = extract_table(header, table)?;
    let functions = source
        .declarations
        .iter()
        .map(|decl| parse_declaration(&decl.text, decl.line))
        .collect();
    Ok(ParsedTable {
        table,
        functions,
        skipped: source.skipped,
    })
}

/// Find the `{ ... } NAME;` body of a table and clean its lines
pub fn extract_table(header: &str, table: TableId) -> Result<TableSource> {
    let name = table.c_struct();
    let mut lexer = Lexer::new(header, 1);
    let tokens = lexer.tokenize();

    let close = tokens
        .windows(3)
        .position(|w| {
            w[0].kind == TokenKind::RBrace && w[1].is_ident(name) && w[2].kind == TokenKind::Semicolon
        })
        .ok_or_else(|| Error::MissingTable { name: name.to_string() })?;

    let mut depth = 0usize;
    let mut open = None;
    for index in (0..=close).rev() {
        match tokens[index].kind {
            TokenKind::RBrace => depth += 1,
            TokenKind::LBrace => {
                depth -= 1;
                if depth == 0 {
                    open = Some(index);
                    break;
                }
            }
            _ => {}
        }
    }
    let open = open.ok_or_else(|| Error::MissingTable { name: name.to_string() })?;

    let body_span = Span::new(tokens[open].span.end, tokens[close].span.start, tokens[open].span.line);
    let body = lexer.slice(body_span);
    Ok(clean_lines(&body, tokens[open].span.line))
}

/// Trim, strip comments, drop blanks and preprocessor lines, and join
/// declarations whose parentheses span several lines.
pub fn clean_lines(body: &str, first_line: usize) -> TableSource {
    let mut source = TableSource::default();
    let mut in_block_comment = false;
    let mut pending: Option<DeclarationLine> = None;

    for (offset, raw) in body.lines().enumerate() {
        let line = first_line + offset;
        let text = strip_comments(raw, &mut in_block_comment);
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        if text.starts_with('#') {
            warn!("line {}: skipping preprocessor line `{}` inside table", line, text);
            source.skipped.push(DeclarationLine {
                text: text.to_string(),
                line,
            });
            continue;
        }

        let joined = match pending.take() {
            Some(mut prev) => {
                prev.text.push(' ');
                prev.text.push_str(text);
                prev
            }
            None => DeclarationLine {
                text: text.to_string(),
                line,
            },
        };

        if paren_balance(&joined.text) > 0 {
            pending = Some(joined);
        } else {
            source.declarations.push(joined);
        }
    }

    if let Some(rest) = pending {
        source.declarations.push(rest);
    }
    source
}

/// Remove `/* */` and `//` comments from one line, tracking open block comments
fn strip_comments(raw: &str, in_block: &mut bool) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        if *in_block {
            if c == '*' && chars.peek() == Some(&'/') {
                chars.next();
                *in_block = false;
            }
            continue;
        }
        match (c, chars.peek()) {
            ('/', Some('*')) => {
                chars.next();
                *in_block = true;
            }
            ('/', Some('/')) => break,
            _ => out.push(c),
        }
    }
    out
}

fn paren_balance(text: &str) -> i64 {
    text.chars().fold(0, |acc, c| match c {
        '(' => acc + 1,
        ')' => acc - 1,
        _ => acc,
    })
}
