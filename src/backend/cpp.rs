//! Native code builder
//!
//! Fragments are collected as typed values (`CppFunction`, `CppTable`) and
//! rendered in one pass through an indenting `CodeWriter`.

/// Indenting line writer
pub struct CodeWriter {
    output: String,
    indent: usize,
    unit: &'static str,
}

impl CodeWriter {
    pub fn new() -> Self {
        Self::with_unit("  ")
    }

    pub fn with_unit(unit: &'static str) -> Self {
        Self {
            output: String::new(),
            indent: 0,
            unit,
        }
    }

    /// Write indented line; empty lines carry no indentation
    pub fn writeln(&mut self, line: &str) {
        if !line.is_empty() {
            for _ in 0..self.indent {
                self.output.push_str(self.unit);
            }
            self.output.push_str(line);
        }
        self.output.push('\n');
    }

    /// Write each line of a multi-line fragment at the current indentation
    pub fn write_lines(&mut self, text: &str) {
        for line in text.lines() {
            self.writeln(line);
        }
    }

    pub fn blank(&mut self) {
        self.output.push('\n');
    }

    pub fn indent(&mut self) {
        self.indent += 1;
    }

    pub fn dedent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    /// `header {` and indent
    pub fn open(&mut self, header: &str) {
        self.writeln(&format!("{} {{", header));
        self.indent();
    }

    /// Dedent and write the closing line (`}` or `};`)
    pub fn close(&mut self, closer: &str) {
        self.dedent();
        self.writeln(closer);
    }

    pub fn finish(self) -> String {
        self.output
    }
}

impl Default for CodeWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// One C++ function definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CppFunction {
    /// `//` lines written above the signature, without the slashes
    pub comments: Vec<String>,
    pub signature: String,
    /// Body lines, relative to the body indentation
    pub body: Vec<String>,
    /// Opening brace on its own line
    pub brace_on_new_line: bool,
}

impl CppFunction {
    pub fn new(signature: impl Into<String>) -> Self {
        Self {
            comments: Vec::new(),
            signature: signature.into(),
            body: Vec::new(),
            brace_on_new_line: false,
        }
    }

    pub fn comment(mut self, text: impl Into<String>) -> Self {
        self.comments.push(text.into());
        self
    }

    pub fn brace_on_new_line(mut self) -> Self {
        self.brace_on_new_line = true;
        self
    }

    /// Append one line; multi-line text is split
    pub fn line(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref();
        if text.is_empty() {
            self.body.push(String::new());
        } else {
            self.body.extend(text.lines().map(str::to_string));
        }
    }

    pub fn render(&self, w: &mut CodeWriter) {
        for comment in &self.comments {
            w.writeln(&format!("// {}", comment));
        }
        if self.brace_on_new_line {
            w.writeln(&self.signature);
            w.writeln("{");
            w.indent();
        } else {
            w.open(&self.signature);
        }
        for line in &self.body {
            w.writeln(line);
        }
        w.close("}");
    }

    pub fn to_source(&self) -> String {
        let mut w = CodeWriter::new();
        self.render(&mut w);
        w.finish()
    }
}

/// A brace-initialized array or struct literal: `prefix = { a, b, ... };`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CppTable {
    pub prefix: String,
    pub entries: Vec<String>,
    /// Optional trailing `// ...` per entry
    pub notes: Vec<Option<String>>,
}

impl CppTable {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            entries: Vec::new(),
            notes: Vec::new(),
        }
    }

    pub fn push(&mut self, entry: impl Into<String>) {
        self.entries.push(entry.into());
        self.notes.push(None);
    }

    pub fn push_noted(&mut self, entry: impl Into<String>, note: impl Into<String>) {
        self.entries.push(entry.into());
        self.notes.push(Some(note.into()));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn render(&self, w: &mut CodeWriter) {
        w.open(&format!("{} =", self.prefix));
        let last = self.entries.len().saturating_sub(1);
        for (i, (entry, note)) in self.entries.iter().zip(&self.notes).enumerate() {
            let comma = if i < last { "," } else { "" };
            match note {
                Some(note) => w.writeln(&format!("{}{} // {}", entry, comma, note)),
                None => w.writeln(&format!("{}{}", entry, comma)),
            }
        }
        w.close("};");
    }
}

/// `#include` lines
pub fn includes(w: &mut CodeWriter, headers: &[&str]) {
    for header in headers {
        if header.starts_with('<') {
            w.writeln(&format!("#include {}", header));
        } else {
            w.writeln(&format!("#include \"{}\"", header));
        }
    }
}
