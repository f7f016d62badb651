//! Parse-time diagnostics.
//!
//! The parser and notation table never abort on the first problem: they push
//! `Diagnostic` values and keep going. Rendering is plain text with a caret
//! line against the offending source line; color is suppressed when the
//! `NO_COLOR` environment variable is set.

pub mod position;

pub use position::Position;

use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub title: String,
    pub code: Option<String>,
    pub message: Option<String>,
    pub file: Option<String>,
    pub position: Option<Position>,
    pub hints: Vec<String>,
}

impl Diagnostic {
    pub fn error(title: impl Into<String>) -> Self {
        Self::new(Severity::Error, title)
    }

    pub fn warning(title: impl Into<String>) -> Self {
        Self::new(Severity::Warning, title)
    }

    fn new(severity: Severity, title: impl Into<String>) -> Self {
        Self {
            severity,
            title: title.into(),
            code: None,
            message: None,
            file: None,
            position: None,
            hints: Vec::new(),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hints.push(hint.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn render(&self, source: Option<&str>, default_file: Option<&str>) -> String {
        let mut out = String::new();
        let use_color = env::var_os("NO_COLOR").is_none();
        let accent = match self.severity {
            Severity::Error => "\u{1b}[31m",
            Severity::Warning => "\u{1b}[33m",
        };
        let reset = "\u{1b}[0m";
        let file = self.file.as_deref().or(default_file).unwrap_or("<unknown>");
        let code = self.code.as_deref().unwrap_or("E000");

        if use_color {
            out.push_str(accent);
        }
        out.push_str(&format!("-- {} -- {} -- [{}]\n", self.title, file, code));
        if use_color {
            out.push_str(reset);
        }

        if let Some(message) = &self.message {
            out.push('\n');
            out.push_str(message);
            out.push('\n');
        }

        if let Some(position) = self.position
            && let Some(line_text) = source.and_then(|src| source_line(src, position.line))
        {
            let gutter_width = position.line.to_string().len();
            let caret_indent = position.column.min(line_text.len());
            out.push('\n');
            out.push_str(&format!(
                "{:>width$} | {}\n",
                position.line,
                line_text,
                width = gutter_width
            ));
            out.push_str(&format!(
                "{:>width$} | {}",
                "",
                " ".repeat(caret_indent),
                width = gutter_width
            ));
            if use_color {
                out.push_str(accent);
            }
            out.push('^');
            if use_color {
                out.push_str(reset);
            }
        }

        if !self.hints.is_empty() {
            out.push('\n');
            for hint in &self.hints {
                out.push_str(&format!("\nHint: {}", hint));
            }
        }

        out
    }
}

pub fn render_diagnostics(
    diagnostics: &[Diagnostic],
    source: Option<&str>,
    default_file: Option<&str>,
) -> String {
    diagnostics
        .iter()
        .map(|diag| diag.render(source, default_file))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn error_count(diagnostics: &[Diagnostic]) -> usize {
    diagnostics.iter().filter(|d| d.is_error()).count()
}

fn source_line(source: &str, line: usize) -> Option<&str> {
    if line == 0 {
        return None;
    }

    source.lines().nth(line - 1)
}
