// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! The expression language used in `{{ }}` tags and macro arguments.
//!
//! Expressions are parsed once, at template compile time, into an [`ast::Expr`]
//! and evaluated against a [`Context`] on every render. Names resolve against
//! the render parameters, then the template metadata, then the builtin
//! functions (`range`, `len`, `str`, ...).

pub mod ast;
mod builtins;
mod eval;
mod parser;

pub use parser::parse_targets;

use crate::context::Context;
use crate::error::{EvalError, Result};
use crate::value::Value;
use std::fmt;

/// An expression parsed and ready to evaluate.
#[derive(Clone, PartialEq)]
pub struct CompiledExpression {
    source: String,
    ast: ast::Expr,
}

impl CompiledExpression {
    /// The expression text as written in the template.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The parsed syntax tree.
    pub fn ast(&self) -> &ast::Expr {
        &self.ast
    }

    /// Evaluates the expression against the scopes of `ctx`.
    pub fn evaluate(&self, ctx: &Context) -> std::result::Result<Value, EvalError> {
        eval::evaluate(&self.ast, ctx)
    }
}

impl fmt::Debug for CompiledExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CompiledExpression({:?})", self.source)
    }
}

/// Parses `text` into a [`CompiledExpression`].
pub fn compile_expression(text: &str) -> Result<CompiledExpression> {
    Ok(CompiledExpression {
        source: text.to_string(),
        ast: parser::parse_expression(text)?,
    })
}
