// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Block tag handlers.
//!
//! A [`Macro`] recognizes the grammar of a block tag and parses the nested
//! body it opens. The builtin macros are `if`/`elif`/`else`, `for` and
//! `include`; host applications add their own with
//! [`Parser::with_macro`](crate::Parser::with_macro).

use crate::context::Context;
use crate::error::{EvalError, Result, TemplateError};
use crate::expression::{compile_expression, parse_targets, CompiledExpression};
use crate::parser::ParseRun;
use crate::template::{Block, Executable};
use crate::value::Value;
use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;

lazy_static! {
    static ref IF_TAG: Regex = Regex::new(r"(?s)^if\s+(.+?)$").unwrap();
    static ref IF_TERMINATORS: Regex =
        Regex::new(r"(?s)^(elif)\s+(.+?)$|^(else)$|^(endif)$").unwrap();
    static ref FOR_TAG: Regex = Regex::new(r"(?s)^for\s+(.+?)\s+in\s+(.+?)$").unwrap();
    static ref FOR_TERMINATOR: Regex = Regex::new(r"^endfor$").unwrap();
    static ref INCLUDE_TAG: Regex = Regex::new(r"(?s)^include\s+(.+?)$").unwrap();
}

/// A pluggable block tag handler.
pub trait Macro: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Parses `tag` if this macro recognizes it.
    ///
    /// Returns `Ok(None)` when the tag belongs to someone else, so the next
    /// registered macro gets a chance.
    fn parse(&self, tag: &str, run: &mut ParseRun<'_>) -> Result<Option<Box<dyn Executable>>>;
}

/// The macros every default parser starts with, in dispatch order.
pub fn builtin() -> Vec<Arc<dyn Macro>> {
    vec![Arc::new(IfMacro), Arc::new(ForMacro), Arc::new(IncludeMacro)]
}

fn capture<'t>(caps: &regex::Captures<'t>, group: usize) -> Option<&'t str> {
    caps.get(group).map(|m| m.as_str())
}

/// `{% if cond %} ... {% elif cond %} ... {% else %} ... {% endif %}`
#[derive(Debug, Default)]
pub struct IfMacro;

#[derive(Debug)]
struct Conditional {
    clauses: Vec<(CompiledExpression, Block)>,
    otherwise: Option<Block>,
}

impl Executable for Conditional {
    fn execute(&self, ctx: &mut Context) -> Result<()> {
        for (condition, body) in &self.clauses {
            if condition.evaluate(ctx)?.is_truthy() {
                return body.execute(ctx);
            }
        }
        match &self.otherwise {
            Some(body) => body.execute(ctx),
            None => Ok(()),
        }
    }
}

impl Macro for IfMacro {
    fn name(&self) -> &str {
        "if"
    }

    fn parse(&self, tag: &str, run: &mut ParseRun<'_>) -> Result<Option<Box<dyn Executable>>> {
        let Some(caps) = IF_TAG.captures(tag) else {
            return Ok(None);
        };
        let mut condition = Some(compile_expression(capture(&caps, 1).unwrap_or_default())?);
        let mut clauses = Vec::new();
        let mut otherwise = None;

        loop {
            let (terminator, body) = run.parse_block("if", "endif", &IF_TERMINATORS)?;
            match condition.take() {
                Some(condition) => clauses.push((condition, body)),
                None => otherwise = Some(body),
            }

            let Some(caps) = IF_TERMINATORS.captures(&terminator.content) else {
                break;
            };
            if let Some(expression) = capture(&caps, 2) {
                if otherwise.is_some() {
                    return Err(TemplateError::Syntax("elif tag cannot come after else".to_string())
                        .at_compile(run.name(), terminator.line));
                }
                condition = Some(
                    compile_expression(expression).map_err(|e| e.at_compile(run.name(), terminator.line))?,
                );
            } else if caps.get(3).is_some() {
                if otherwise.is_some() {
                    return Err(TemplateError::Syntax("Only one else tag is allowed per if".to_string())
                        .at_compile(run.name(), terminator.line));
                }
                // The next body parsed belongs to the else branch.
                otherwise = Some(Block::default());
            } else {
                break;
            }
        }

        Ok(Some(Box::new(Conditional { clauses, otherwise })))
    }
}

/// `{% for name in items %} ... {% endfor %}` and `{% for k, v in pairs %}`.
///
/// Loop variables stay bound after the loop ends.
#[derive(Debug, Default)]
pub struct ForMacro;

#[derive(Debug)]
struct Loop {
    targets: Vec<String>,
    unpack: bool,
    iterable: CompiledExpression,
    body: Block,
}

impl Loop {
    fn bind(&self, ctx: &mut Context, item: Value) -> std::result::Result<(), EvalError> {
        if !self.unpack {
            if let Some(name) = self.targets.first() {
                ctx.set(name.clone(), item);
            }
            return Ok(());
        }

        let values = item.iterate()?;
        let expected = self.targets.len();
        if values.len() < expected {
            return Err(EvalError::Value(format!(
                "not enough values to unpack (expected {}, got {})",
                expected,
                values.len()
            )));
        }
        if values.len() > expected {
            return Err(EvalError::Value(format!(
                "too many values to unpack (expected {})",
                expected
            )));
        }
        for (name, value) in self.targets.iter().zip(values) {
            ctx.set(name.clone(), value);
        }
        Ok(())
    }
}

impl Executable for Loop {
    fn execute(&self, ctx: &mut Context) -> Result<()> {
        let items = self.iterable.evaluate(ctx)?.iterate()?;
        for item in items {
            self.bind(ctx, item)?;
            self.body.execute(ctx)?;
        }
        Ok(())
    }
}

impl Macro for ForMacro {
    fn name(&self) -> &str {
        "for"
    }

    fn parse(&self, tag: &str, run: &mut ParseRun<'_>) -> Result<Option<Box<dyn Executable>>> {
        let Some(caps) = FOR_TAG.captures(tag) else {
            return Ok(None);
        };
        let names = capture(&caps, 1).unwrap_or_default();
        let targets = parse_targets(names)?;
        let iterable = compile_expression(capture(&caps, 2).unwrap_or_default())?;
        let (_, body) = run.parse_block("for", "endfor", &FOR_TERMINATOR)?;

        Ok(Some(Box::new(Loop {
            targets,
            unpack: names.contains(','),
            iterable,
            body,
        })))
    }
}

/// `{% include expr %}` where `expr` is a template or a template name.
#[derive(Debug, Default)]
pub struct IncludeMacro;

#[derive(Debug)]
struct Include {
    target: CompiledExpression,
}

impl Executable for Include {
    fn execute(&self, ctx: &mut Context) -> Result<()> {
        let template = match self.target.evaluate(ctx)? {
            Value::Template(template) => template,
            Value::Str(name) => {
                let loader = ctx
                    .meta()
                    .loader()
                    .and_then(|loader| loader.upgrade())
                    .ok_or_else(|| EvalError::Value(format!("Cannot load '{}' by name", name)))?;
                loader.load(&name)?
            }
            other => {
                return Err(EvalError::Type(format!(
                    "Expected a Template or a str, can not be {}",
                    other.type_name()
                ))
                .into())
            }
        };
        template.render_in_sub_context(ctx, None)
    }
}

impl Macro for IncludeMacro {
    fn name(&self) -> &str {
        "include"
    }

    fn parse(&self, tag: &str, _run: &mut ParseRun<'_>) -> Result<Option<Box<dyn Executable>>> {
        let Some(caps) = INCLUDE_TAG.captures(tag) else {
            return Ok(None);
        };
        let target = compile_expression(capture(&caps, 1).unwrap_or_default())?;
        Ok(Some(Box::new(Include { target })))
    }
}
