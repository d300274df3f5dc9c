// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Error types for the Typhoon template engine.
//!
//! This module defines [`TemplateError`], the main error enum, and
//! [`EvalError`], the fault raised by expressions while a template renders.
//!
//! # Error Categories
//!
//! - **Compile errors**: unknown tags, malformed macro grammar, unterminated
//!   blocks and malformed expressions, attributed to a template and line
//! - **Render errors**: anything that fails while a segment executes,
//!   attributed to a template and line
//! - **Not found**: no source could provide the requested template
//!
//! # Source Context
//!
//! Compile errors include a [`SourceContext`] so the message shows the
//! offending lines of the template.

use std::fmt;
use thiserror::Error;

/// Source context for enhanced error messages.
///
/// Captures a snippet of source code around an error location,
/// enabling rich error messages with line numbers and visual indicators.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceContext {
    /// All lines from the source file.
    pub lines: Vec<String>,
    /// The line number where the error occurred (1-indexed).
    pub error_line: usize,
    /// First line number of the snippet (1-indexed).
    pub snippet_start: usize,
    /// Last line number of the snippet (1-indexed).
    pub snippet_end: usize,
}

impl SourceContext {
    /// Creates a source context from template source and an error line.
    ///
    /// Captures 2 lines before and after the error line.
    pub fn from_source(source: &str, line: usize) -> Self {
        let lines: Vec<String> = source.lines().map(str::to_string).collect();
        let snippet_start = line.saturating_sub(2).max(1);
        let snippet_end = (line + 2).min(lines.len());

        Self {
            lines,
            error_line: line,
            snippet_start,
            snippet_end,
        }
    }

    /// Formats the source snippet with line numbers, marking the error line.
    ///
    /// ```text
    ///    1 | <ul>
    ///  > 2 | {% for item in %}
    ///    3 | </ul>
    /// ```
    pub fn format_snippet(&self) -> String {
        let mut result = String::new();

        for line_num in self.snippet_start..=self.snippet_end {
            let Some(line) = self.lines.get(line_num - 1) else {
                break;
            };
            let marker = if line_num == self.error_line { ">" } else { " " };
            result.push_str(&format!(" {} {:3} | {}\n", marker, line_num, line));
        }

        result
    }
}

impl fmt::Display for SourceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_snippet())
    }
}

/// Helper struct for displaying optional source context.
pub struct OptSourceContextDisplay<'a>(pub &'a Option<SourceContext>);

impl fmt::Display for OptSourceContextDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(ctx) => write!(f, "\n{}", ctx),
            None => Ok(()),
        }
    }
}

/// Helper trait for formatting optional source context.
pub trait AsDisplay<'a> {
    /// Wraps self for Display formatting.
    fn as_display(&'a self) -> OptSourceContextDisplay<'a>;
}

impl<'a> AsDisplay<'a> for Option<SourceContext> {
    fn as_display(&'a self) -> OptSourceContextDisplay<'a> {
        OptSourceContextDisplay(self)
    }
}

/// A fault raised while evaluating an expression or running a macro.
///
/// These never reach callers directly: the block that runs the failing
/// segment wraps them into [`TemplateError::Render`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    /// A name was not bound in parameters, metadata or builtins.
    #[error("name '{0}' is not defined")]
    UndefinedName(String),

    /// An operation was applied to a value of the wrong type.
    #[error("{0}")]
    Type(String),

    /// A value had the right type but an unusable content.
    #[error("{0}")]
    Value(String),

    /// A list index was out of range.
    #[error("{0}")]
    Index(String),

    /// A map key was missing.
    #[error("key {0} not found")]
    Key(String),

    /// An attribute or method does not exist on the value.
    #[error("{0}")]
    Attribute(String),

    /// Division or modulo by zero.
    #[error("division by zero")]
    ZeroDivision,

    /// Integer arithmetic overflowed.
    #[error("integer overflow")]
    Overflow,
}

/// The main error type for Typhoon operations.
#[derive(Error, Debug)]
pub enum TemplateError {
    /// Turning source text into a segment tree failed.
    #[error("{message} [{name} on line {line}]{}", source_context.as_display())]
    Compile {
        /// Description of the problem.
        message: String,
        /// Name of the template being compiled.
        name: String,
        /// Line of the token that triggered the error.
        line: usize,
        /// Snippet of the offending source.
        source_context: Option<SourceContext>,
    },

    /// Executing a segment against a context failed.
    #[error("{message} [{name} on line {line}]")]
    Render {
        /// Description of the problem.
        message: String,
        /// Name of the template being rendered.
        name: String,
        /// Line of the segment that failed.
        line: usize,
    },

    /// No source could provide the requested template.
    #[error("could not find template '{0}'")]
    NotFound(String),

    /// Malformed template syntax, not yet attributed to a line.
    #[error("{0}")]
    Syntax(String),

    /// Expression fault, not yet attributed to a line.
    #[error(transparent)]
    Eval(#[from] EvalError),

    /// A template name resolved to a path a source refuses to serve.
    #[error("Resolution error: {0}")]
    Resolution(String),

    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Cache operation failed.
    #[error("Cache error: {0}")]
    Cache(String),
}

impl TemplateError {
    /// Attributes an error to a template line while compiling.
    ///
    /// Errors that already carry a location pass through unchanged.
    pub fn at_compile(self, name: &str, line: usize) -> Self {
        match self {
            TemplateError::Compile { .. } => self,
            other => TemplateError::Compile {
                message: other.to_string(),
                name: name.to_string(),
                line,
                source_context: None,
            },
        }
    }

    /// Attributes an error to a template line while rendering.
    ///
    /// Render errors pass through unchanged so nested blocks and includes
    /// report the innermost failing segment.
    pub fn at_render(self, name: &str, line: usize) -> Self {
        match self {
            TemplateError::Render { .. } => self,
            other => TemplateError::Render {
                message: other.to_string(),
                name: name.to_string(),
                line,
            },
        }
    }

    /// Attaches a source snippet to a compile error that has none yet.
    pub fn with_source(self, source: &str) -> Self {
        match self {
            TemplateError::Compile {
                message,
                name,
                line,
                source_context: None,
            } => TemplateError::Compile {
                message,
                name,
                line,
                source_context: Some(SourceContext::from_source(source, line)),
            },
            other => other,
        }
    }

    /// Returns the template line this error is attributed to, if any.
    pub fn line(&self) -> Option<usize> {
        match self {
            TemplateError::Compile { line, .. } | TemplateError::Render { line, .. } => Some(*line),
            _ => None,
        }
    }
}

/// Convenience type alias for Results with [`TemplateError`].
pub type Result<T> = std::result::Result<T, TemplateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_errors_are_not_wrapped_twice() {
        let inner = TemplateError::from(EvalError::UndefinedName("x".into())).at_render("inner.html", 3);
        let outer = inner.at_render("outer.html", 1);
        match outer {
            TemplateError::Render { name, line, message } => {
                assert_eq!(name, "inner.html");
                assert_eq!(line, 3);
                assert_eq!(message, "name 'x' is not defined");
            }
            other => panic!("expected render error, got {other:?}"),
        }
    }

    #[test]
    fn test_compile_error_display_includes_snippet() {
        let err = TemplateError::Syntax("bad tag".into())
            .at_compile("page.html", 2)
            .with_source("one\ntwo\nthree");
        let text = err.to_string();
        assert!(text.starts_with("bad tag [page.html on line 2]"));
        assert!(text.contains(" >   2 | two"));
        assert!(text.contains("    1 | one"));
    }

    #[test]
    fn test_snippet_is_clamped_to_source() {
        let ctx = SourceContext::from_source("only", 1);
        assert_eq!(ctx.snippet_start, 1);
        assert_eq!(ctx.snippet_end, 1);
        assert_eq!(ctx.format_snippet(), " >   1 | only\n");
    }
}
