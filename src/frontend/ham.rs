//! Ham declaration parser
//!
//! Reads the `HamType`/`HamResult` enums from ham_const.h and the
//! `g_hamFunctions[]` signature array from ham_manager.cpp. Array position
//! is the function id. The two sources are joined by id here and are
//! cross-checked separately by `middle::validate`.

use log::debug;

use crate::frontend::ast::{
    EnumEntry, HamCatalogue, HamFunctionEntry, HamParam, HamReturn, HamSignature,
};
use crate::frontend::lexer::Lexer;
use crate::frontend::token::{Token, TokenKind};
use crate::utils::{Error, Result};

pub const HAM_TYPE_ENUM: &str = "HamType";
pub const HAM_RESULT_ENUM: &str = "HamResult";
pub const HAM_FUNCTIONS_ARRAY: &str = "g_hamFunctions";

/// Enum entry that only terminates `HamType`
const END_MARKER: &str = "EndMarker";

/// Parse both Ham sources into a catalogue
pub fn parse_catalogue(enum_source: &str, array_source: &str) -> Result<HamCatalogue> {
    let types = parse_enum(enum_source, HAM_TYPE_ENUM, "Ham_")?
        .into_iter()
        .filter(|e| e.name != END_MARKER)
        .collect::<Vec<_>>();
    let results = match parse_enum(enum_source, HAM_RESULT_ENUM, "HAM_") {
        Ok(results) => results,
        Err(err) => {
            debug!("{}; using built-in HAM_RESULT values", err);
            default_results()
        }
    };
    let signatures = parse_signature_array(array_source, HAM_FUNCTIONS_ARRAY)?;

    Ok(build_catalogue(types, signatures, results))
}

/// Join enum entries with array rows by id
pub fn build_catalogue(
    types: Vec<EnumEntry>,
    signatures: Vec<HamSignature>,
    results: Vec<EnumEntry>,
) -> HamCatalogue {
    let entries = types
        .into_iter()
        .map(|entry| {
            let id = usize::try_from(entry.value).unwrap_or(usize::MAX);
            HamFunctionEntry {
                signature: signatures.get(id).cloned(),
                name: entry.name,
                id,
            }
        })
        .collect();

    HamCatalogue {
        entries,
        signatures,
        results,
    }
}

/// `HamResult` as shipped with the runtime
pub fn default_results() -> Vec<EnumEntry> {
    ["UNSET", "IGNORED", "HANDLED", "OVERRIDE", "SUPERCEDE"]
        .iter()
        .zip(0..)
        .map(|(name, value)| EnumEntry {
            name: name.to_string(),
            value,
            line: 0,
        })
        .collect()
}

/// Cursor over a token stream
struct Cursor<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(tokens: &'a [Token], pos: usize) -> Self {
        Self { tokens, pos }
    }

    fn current(&self) -> &'a Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.pos.min(last)]
    }

    fn advance(&mut self) -> &'a Token {
        let token = self.current();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn consume(&mut self, kind: &TokenKind) -> bool {
        if &self.current().kind == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<&'a Token> {
        if self.current().kind == kind {
            Ok(self.advance())
        } else {
            Err(Error::UnexpectedToken {
                expected: kind.to_string(),
                got: self.current().kind.to_string(),
                span: self.current().span,
            })
        }
    }

    fn at_end(&self) -> bool {
        self.current().kind == TokenKind::Eof
    }
}

/// Parse `enum NAME { PREFIXIdent [= n], ... }`.
///
/// Values auto-increment from the last explicit one. Entries not carrying
/// `prefix` are ignored and do not consume a value.
pub fn parse_enum(source: &str, enum_name: &str, prefix: &str) -> Result<Vec<EnumEntry>> {
    let tokens = Lexer::new(source, 1).tokenize();
    let start = tokens
        .windows(3)
        .position(|w| w[0].is_ident("enum") && w[1].is_ident(enum_name) && w[2].kind == TokenKind::LBrace)
        .ok_or_else(|| Error::MissingEnum { name: enum_name.to_string() })?;

    let mut cursor = Cursor::new(&tokens, start + 3);
    let mut entries = Vec::new();
    let mut next_value = 0i64;

    while !cursor.consume(&TokenKind::RBrace) {
        if cursor.at_end() {
            return Err(Error::MissingEnum { name: enum_name.to_string() });
        }
        let token = cursor.advance();
        let Some(ident) = token.ident() else {
            continue;
        };

        if cursor.consume(&TokenKind::Eq) {
            let value = cursor.advance();
            next_value = value.kind.as_int().ok_or_else(|| Error::UnexpectedToken {
                expected: "integer".to_string(),
                got: value.kind.to_string(),
                span: value.span,
            })?;
        }

        if let Some(name) = ident.strip_prefix(prefix) {
            entries.push(EnumEntry {
                name: name.to_string(),
                value: next_value,
                line: token.span.line,
            });
            next_value += 1;
        }
        cursor.consume(&TokenKind::Comma);
    }

    Ok(entries)
}

/// Parse `NAME[] = { {"key", HAM_RET_*, n, {HAM_PARAM_*, ...}}, ... };`
///
/// Rows whose first field is not a string literal (the `nullptr` terminator)
/// are skipped and do not take an id.
pub fn parse_signature_array(source: &str, array_name: &str) -> Result<Vec<HamSignature>> {
    let tokens = Lexer::new(source, 1).tokenize();
    let start = tokens
        .windows(5)
        .position(|w| {
            w[0].is_ident(array_name)
                && w[1].kind == TokenKind::LBracket
                && w[2].kind == TokenKind::RBracket
                && w[3].kind == TokenKind::Eq
                && w[4].kind == TokenKind::LBrace
        })
        .ok_or_else(|| Error::MissingArray { name: array_name.to_string() })?;

    let mut cursor = Cursor::new(&tokens, start + 5);
    let mut rows = Vec::new();

    loop {
        if cursor.consume(&TokenKind::RBrace) {
            break;
        }
        if cursor.at_end() {
            return Err(Error::MissingArray { name: array_name.to_string() });
        }
        let open = cursor.expect(TokenKind::LBrace)?;
        if let Some(row) = parse_row(&mut cursor, open.span.line)? {
            rows.push(row);
        }
        cursor.consume(&TokenKind::Comma);
    }

    Ok(rows)
}

/// Parse one row after its `{`, through its closing `}`
fn parse_row(cursor: &mut Cursor<'_>, line: usize) -> Result<Option<HamSignature>> {
    let key = match &cursor.advance().kind {
        TokenKind::StringLit(key) => Some(key.clone()),
        _ => None,
    };
    cursor.expect(TokenKind::Comma)?;

    let ret = cursor.advance();
    let return_code = ret.ident().map(HamReturn::from_code).ok_or_else(|| Error::UnexpectedToken {
        expected: "HAM_RET_* code".to_string(),
        got: ret.kind.to_string(),
        span: ret.span,
    })?;
    cursor.expect(TokenKind::Comma)?;

    let count = cursor.advance();
    let declared_param_count = count
        .kind
        .as_int()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| Error::UnexpectedToken {
            expected: "parameter count".to_string(),
            got: count.kind.to_string(),
            span: count.span,
        })?;
    cursor.expect(TokenKind::Comma)?;

    cursor.expect(TokenKind::LBrace)?;
    let mut params = Vec::new();
    while !cursor.consume(&TokenKind::RBrace) {
        let token = cursor.advance();
        match &token.kind {
            TokenKind::Ident(code) => params.push(HamParam::from_code(code)),
            TokenKind::Comma => {}
            other => {
                return Err(Error::UnexpectedToken {
                    expected: "HAM_PARAM_* code".to_string(),
                    got: other.to_string(),
                    span: token.span,
                })
            }
        }
    }
    cursor.expect(TokenKind::RBrace)?;

    Ok(key.map(|key| HamSignature {
        key,
        return_code,
        declared_param_count,
        params,
        line,
    }))
}
