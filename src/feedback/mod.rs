//! Structured Feedback Module
//!
//! Machine-readable summary of one generator run:
//! - per-table counts
//! - diagnostics keyed by source line
//! - Ham catalogue status and the files written

use serde::{Deserialize, Serialize};

use crate::middle::validate::HamIssue;
use crate::utils::Error;

// ==================== Diagnostics ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line: usize,
}

/// One finding, attributed to a table or to the Ham catalogue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// `dll`, `eng` or `ham`
    pub origin: String,
    pub function: Option<String>,
    pub location: Option<Location>,
    pub message: String,
    /// The source line the finding is about
    pub original: Option<String>,
}

impl Diagnostic {
    pub fn new(severity: Severity, origin: &str, message: impl Into<String>) -> Self {
        Self {
            severity,
            origin: origin.to_string(),
            function: None,
            location: None,
            message: message.into(),
            original: None,
        }
    }

    pub fn warning(origin: &str, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, origin, message)
    }

    pub fn function(mut self, name: &str) -> Self {
        self.function = Some(name.to_string());
        self
    }

    pub fn at(mut self, file: &str, line: usize) -> Self {
        self.location = Some(Location {
            file: file.to_string(),
            line,
        });
        self
    }

    pub fn original(mut self, text: &str) -> Self {
        self.original = Some(text.trim().to_string());
        self
    }

    /// Diagnostic for a fatal error, located when the error carries a span
    pub fn from_error(error: &Error, origin: &str, file: &str) -> Self {
        let diagnostic = Self::new(Severity::Error, origin, error.to_string());
        match error.span() {
            Some(span) => diagnostic.at(file, span.line),
            None => diagnostic,
        }
    }

    /// Diagnostic for a Ham validation finding
    pub fn from_issue(issue: &HamIssue, severity: Severity, file: &str) -> Self {
        let diagnostic = Self::new(severity, "ham", issue.to_string());
        match issue.line() {
            Some(line) => diagnostic.at(file, line),
            None => diagnostic,
        }
    }
}

// ==================== Summaries ====================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSummary {
    pub table: String,
    /// Declaration lines found in the table body
    pub declared: usize,
    pub parsed: usize,
    pub unparsable: usize,
    /// API bodies emitted but not installed
    pub flagged: usize,
    /// Left out of the API surface by name
    pub excluded: usize,
    pub events: usize,
    pub api_functions: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HamSummary {
    pub entries: usize,
    pub signatures: usize,
    pub trampolines: usize,
    pub missing_signatures: usize,
    pub issues: usize,
}

// ==================== Generation Report ====================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationReport {
    pub success: bool,
    pub tables: Vec<TableSummary>,
    pub ham: Option<HamSummary>,
    pub diagnostics: Vec<Diagnostic>,
    /// Written (or, for a dry run, would-be written) paths
    pub files: Vec<String>,
}

impl GenerationReport {
    pub fn new() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        if diagnostic.severity == Severity::Error {
            self.success = false;
        }
        self.diagnostics.push(diagnostic);
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics.iter().filter(|d| d.severity == severity).count()
    }

    pub fn has_errors(&self) -> bool {
        self.count(Severity::Error) > 0
    }

    /// Total unparsable declarations across tables
    pub fn unparsable(&self) -> usize {
        self.tables.iter().map(|t| t.unparsable).sum()
    }

    /// Output as JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}
