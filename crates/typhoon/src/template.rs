// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Compiled templates and the segment tree they are made of.

use crate::context::{Context, Meta};
use crate::error::Result;
use crate::expression::CompiledExpression;
use crate::value::Params;
use std::fmt;

/// One rendering step: append text, evaluate an expression, run a macro.
pub trait Executable: Send + Sync + fmt::Debug {
    /// Performs the step against `ctx`, writing into its output buffer.
    fn execute(&self, ctx: &mut Context) -> Result<()>;
}

/// Appends literal template text.
#[derive(Debug)]
pub struct Text(pub String);

impl Executable for Text {
    fn execute(&self, ctx: &mut Context) -> Result<()> {
        ctx.write(self.0.as_str());
        Ok(())
    }
}

/// Evaluates an expression and appends its escaped string form.
#[derive(Debug)]
pub struct Output(pub CompiledExpression);

impl Executable for Output {
    fn execute(&self, ctx: &mut Context) -> Result<()> {
        let value = self.0.evaluate(ctx)?.to_string();
        let value = match ctx.meta().escape() {
            Some(escape) => escape(&value),
            None => value,
        };
        ctx.write(value);
        Ok(())
    }
}

/// An executable bound to the source line it came from.
#[derive(Debug)]
pub struct Segment {
    /// Line of the token that produced the segment.
    pub line: usize,
    /// The step to perform.
    pub executable: Box<dyn Executable>,
}

/// An ordered segment list belonging to a named template.
///
/// Blocks hold the bodies of control constructs. They are rendered only by
/// their owning construct, never on their own.
#[derive(Debug, Default)]
pub struct Block {
    name: String,
    segments: Vec<Segment>,
}

impl Block {
    /// Creates an empty block for the template `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            segments: Vec::new(),
        }
    }

    /// Appends a segment.
    pub fn push(&mut self, line: usize, executable: Box<dyn Executable>) {
        self.segments.push(Segment { line, executable });
    }

    /// The segments in execution order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Name of the template this block belongs to.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs every segment in order.
    ///
    /// Failures are attributed to the failing segment's line unless they
    /// already carry a render location.
    pub fn execute(&self, ctx: &mut Context) -> Result<()> {
        for segment in &self.segments {
            segment
                .executable
                .execute(ctx)
                .map_err(|e| e.at_render(&self.name, segment.line))?;
        }
        Ok(())
    }
}

/// A compiled template: immutable, shareable, renderable many times.
pub struct Template {
    body: Block,
    params: Params,
    meta: Meta,
}

impl Template {
    pub(crate) fn new(body: Block, params: Params, meta: Meta) -> Self {
        Self { body, params, meta }
    }

    /// The template name used in diagnostics.
    pub fn name(&self) -> &str {
        self.meta.name()
    }

    /// The top-level segments.
    pub fn segments(&self) -> &[Segment] {
        self.body.segments()
    }

    /// Default parameters, overridden by render parameters.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Metadata captured at compile time.
    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    /// Renders the template with `params` layered over its defaults.
    pub fn render(&self, params: Params) -> Result<String> {
        let mut merged = self.params.clone();
        merged.extend(params);
        let mut ctx = Context::new(merged, self.meta.clone());
        self.body.execute(&mut ctx)?;
        Ok(ctx.render())
    }

    /// Renders into the buffer of an enclosing render.
    ///
    /// The enclosing parameters win over this template's defaults; this
    /// template's metadata (then `meta`, when given) overlays the enclosing
    /// metadata.
    pub fn render_in_sub_context(&self, ctx: &Context, meta: Option<&Meta>) -> Result<()> {
        let mut params = self.params.clone();
        params.extend(ctx.params().iter().map(|(k, v)| (k.clone(), v.clone())));
        let meta = match meta {
            Some(extra) => self.meta.overlay(extra),
            None => self.meta.clone(),
        };
        let mut sub = ctx.sub_context(params, &meta);
        self.body.execute(&mut sub)
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("name", &self.name())
            .field("segments", &self.body.segments().len())
            .field("params", &self.params)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::compile_expression;
    use crate::params;
    use crate::value::Value;

    fn output(text: &str) -> Box<dyn Executable> {
        Box::new(Output(compile_expression(text).unwrap()))
    }

    #[test]
    fn test_render_merges_default_params() {
        let mut body = Block::new("greeting");
        body.push(1, Box::new(Text("Hello ".to_string())));
        body.push(1, output("who"));
        let template = Template::new(body, params! { "who" => "nobody" }, Meta::new("greeting"));

        assert_eq!(template.render(params! {}).unwrap(), "Hello nobody");
        assert_eq!(template.render(params! { "who" => "world" }).unwrap(), "Hello world");
    }

    #[test]
    fn test_failing_segment_reports_its_line() {
        let mut body = Block::new("broken.txt");
        body.push(1, Box::new(Text("ok\n".to_string())));
        body.push(2, output("missing"));
        let template = Template::new(body, params! {}, Meta::new("broken.txt"));

        let err = template.render(params! {}).unwrap_err();
        assert_eq!(err.to_string(), "name 'missing' is not defined [broken.txt on line 2]");
    }

    #[test]
    fn test_sub_context_rendering_shares_output() {
        let mut body = Block::new("inner");
        body.push(1, output("x"));
        let inner = Template::new(body, params! { "x" => "default" }, Meta::new("inner"));

        let ctx = Context::new(params! {}, Meta::new("outer"));
        ctx.write("[");
        inner.render_in_sub_context(&ctx, None).unwrap();
        let with_x = ctx.sub_context(params! { "x" => Value::from("given") }, &Meta::new("outer"));
        inner.render_in_sub_context(&with_x, None).unwrap();
        ctx.write("]");
        assert_eq!(ctx.render(), "[defaultgiven]");
    }
}
