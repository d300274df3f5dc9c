// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

// Warn on missing documentation for public items
#![warn(missing_docs)]

// Compile errors carry a source snippet, which makes the error type large.
#![allow(clippy::result_large_err)]

//! # Typhoon
//!
//! A small text templating engine.
//!
//! Templates mix literal text with `{{ expression }}` output tags,
//! `{% block %}` tags and `{# comments #}`. Source is tokenized, parsed once
//! into a segment tree and rendered any number of times against a parameter
//! map.
//!
//! ## Features
//!
//! - Expressions with arithmetic, comparisons, calls, attribute and subscript
//!   access, collection literals and builtin functions
//! - `if`/`elif`/`else`, `for` with unpacking, and `include`
//! - Pluggable block macros and configurable delimiters
//! - Escaping selected by template extension (HTML for `.html`/`.htm`)
//! - A caching loader over memory and directory sources
//!
//! ## Quick Start
//!
//! ```rust
//! use typhoon::{params, render};
//!
//! let out = render(
//!     "{% for name in names %}Hello {{ name.upper() }}! {% endfor %}",
//!     params! { "names" => vec!["ada", "alan"] },
//! )?;
//! assert_eq!(out, "Hello ADA! Hello ALAN! ");
//! # Ok::<(), typhoon::TemplateError>(())
//! ```

/// Compiled template caching.
pub mod cache;
/// Render state: parameters, metadata and the output buffer.
pub mod context;
/// Error types and reporting.
pub mod error;
/// Output escaping.
pub mod escape;
/// The expression language.
pub mod expression;
/// Template tokenizer.
pub mod lexer;
/// Named template loading.
pub mod loader;
/// Block tag macros.
pub mod macros;
/// Template parser.
pub mod parser;
/// Template sources (memory, filesystem).
pub mod source;
/// Compiled templates and segments.
pub mod template;
/// Dynamic values.
pub mod value;

pub use cache::{Cache, MemoryCache, NoOpCache};
pub use context::{Context, EscapeFn, Meta};
pub use error::{EvalError, Result, SourceContext, TemplateError};
pub use escape::escape_html;
pub use expression::{compile_expression, CompiledExpression};
pub use lexer::{tokenize, Lexer, Syntax, Token, TokenKind};
pub use loader::{Loader, LoaderBuilder, LoaderRef};
pub use macros::Macro;
pub use parser::{ParseRun, Parser};
#[cfg(feature = "filesystem")]
pub use source::DirectorySource;
pub use source::{MemorySource, TemplateSource};
pub use template::{Block, Executable, Template};
pub use value::{Function, Map, Params, Value};

use lazy_static::lazy_static;

lazy_static! {
    static ref DEFAULT_PARSER: Parser = Parser::new();
}

/// Compiles `source` with the default parser as an unnamed template.
pub fn compile(source: &str) -> Result<Template> {
    DEFAULT_PARSER.compile_str(source)
}

/// Compiles and renders `source` in one go.
pub fn render(source: &str, params: Params) -> Result<String> {
    compile(source)?.render(params)
}

#[cfg(test)]
mod tests;
