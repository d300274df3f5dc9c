// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Recursive-descent block parser.
//!
//! A [`Parser`] turns template source into a [`Template`]. Each call to
//! [`Parser::compile`] starts a [`ParseRun`] that walks the token stream:
//! text and expression tokens become segments directly, block tags are offered
//! to the registered [`Macro`]s in order. A macro that recognizes its tag
//! parses its own body by calling [`ParseRun::parse_block`], which recurses
//! until one of the macro's terminator tags shows up.

use crate::context::{EscapeFn, Meta};
use crate::error::{Result, TemplateError};
use crate::escape::EscapeRegistry;
use crate::expression::compile_expression;
use crate::lexer::{Lexer, Syntax, Token, TokenKind};
use crate::macros::{self, Macro};
use crate::template::{Block, Output, Template, Text};
use crate::value::Params;
use regex::Regex;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Name given to templates compiled from a bare string.
pub const STRING_TEMPLATE_NAME: &str = "__string__";

/// Compiles template source into [`Template`]s.
#[derive(Clone)]
pub struct Parser {
    syntax: Syntax,
    macros: Vec<Arc<dyn Macro>>,
    escapes: EscapeRegistry,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    /// A parser with the default syntax, the builtin macros (`if`, `for`,
    /// `include`) and HTML escaping for `.html`/`.htm` templates.
    pub fn new() -> Self {
        Self {
            syntax: Syntax::default(),
            macros: macros::builtin(),
            escapes: EscapeRegistry::default(),
        }
    }

    /// A parser that recognizes no block tags at all.
    pub fn without_macros() -> Self {
        Self {
            macros: Vec::new(),
            ..Self::new()
        }
    }

    /// Replaces the delimiter syntax.
    pub fn with_syntax(mut self, syntax: Syntax) -> Self {
        self.syntax = syntax;
        self
    }

    /// Registers a macro after the existing ones.
    pub fn with_macro(mut self, macro_: impl Macro + 'static) -> Self {
        self.macros.push(Arc::new(macro_));
        self
    }

    /// Registers an escape function for a file extension.
    pub fn with_escape(mut self, extension: &str, escape: EscapeFn) -> Self {
        self.escapes.insert(extension, escape);
        self
    }

    /// Stops escaping output of templates with this extension.
    pub fn without_escape(mut self, extension: &str) -> Self {
        self.escapes.remove(extension);
        self
    }

    /// The delimiter syntax in use.
    pub fn syntax(&self) -> &Syntax {
        &self.syntax
    }

    /// Tokenizes `source` with this parser's syntax.
    pub fn tokenize<'a>(&'a self, source: &'a str) -> Lexer<'a> {
        self.syntax.tokenize(source)
    }

    /// Compiles `source` into a template called `name`.
    ///
    /// The escape function is picked from the extension of `name` unless
    /// `meta` already carries one.
    pub fn compile(&self, source: &str, name: &str, params: Params, meta: Meta) -> Result<Template> {
        let meta = if meta.escape().is_some() {
            meta.with_name(name)
        } else {
            let escape = self.escapes.for_name(name);
            meta.with_escape(escape).with_name(name)
        };

        let mut run = ParseRun {
            parser: self,
            tokens: self.syntax.tokenize(source),
            name: name.to_string(),
        };
        let body = run.parse_all().map_err(|e| e.with_source(source))?;
        Ok(Template::new(body, params, meta))
    }

    /// Compiles `source` as an unnamed template with no defaults.
    pub fn compile_str(&self, source: &str) -> Result<Template> {
        self.compile(source, STRING_TEMPLATE_NAME, Params::new(), Meta::default())
    }
}

impl fmt::Debug for Parser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parser")
            .field("syntax", &self.syntax)
            .field("macros", &self.macros.iter().map(|m| m.name()).collect::<Vec<_>>())
            .field("escapes", &self.escapes)
            .finish()
    }
}

/// The state of one compilation, handed to macros so they can parse bodies.
pub struct ParseRun<'a> {
    parser: &'a Parser,
    tokens: Lexer<'a>,
    name: String,
}

impl ParseRun<'_> {
    /// Name of the template being compiled.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parses segments until a block tag matching `terminator` appears.
    ///
    /// Returns the terminating token together with the accumulated body.
    /// Reaching the end of the source is an error naming `start_tag` and
    /// `end_tag`; a block tag no macro recognizes that does not match
    /// `terminator` is an error too.
    pub fn parse_block(&mut self, start_tag: &str, end_tag: &str, terminator: &Regex) -> Result<(Token, Block)> {
        match self.parse_until()? {
            (Some(token), block) if terminator.is_match(&token.content) => Ok((token, block)),
            (Some(token), _) => Err(TemplateError::Syntax(format!("{} is not a recognized tag", token.content))
                .at_compile(&self.name, token.line)),
            (None, _) => Err(TemplateError::Syntax(format!(
                "{} tag could not find a corresponding {}",
                start_tag, end_tag
            ))),
        }
    }

    fn parse_all(&mut self) -> Result<Block> {
        match self.parse_until()? {
            (None, block) => Ok(block),
            (Some(token), _) => Err(TemplateError::Syntax(format!(
                "{{% {} %}} is not a recognized tag.",
                token.content
            ))
            .at_compile(&self.name, token.line)),
        }
    }

    /// Consumes tokens into a block until the end of the source or the first
    /// block tag no macro recognizes.
    fn parse_until(&mut self) -> Result<(Option<Token>, Block)> {
        let mut block = Block::new(self.name.clone());
        while let Some(token) = self.tokens.next() {
            let line = token.line;
            match token.kind {
                TokenKind::Text => block.push(line, Box::new(Text(token.content))),
                TokenKind::Expression => {
                    let expression = compile_expression(&token.content)
                        .map_err(|e| e.at_compile(&self.name, line))?;
                    block.push(line, Box::new(Output(expression)));
                }
                TokenKind::Block => match self.dispatch(&token.content).map_err(|e| e.at_compile(&self.name, line))? {
                    Some(executable) => block.push(line, executable),
                    None => return Ok((Some(token), block)),
                },
            }
        }
        Ok((None, block))
    }

    fn dispatch(&mut self, tag: &str) -> Result<Option<Box<dyn crate::template::Executable>>> {
        let parser = self.parser;
        for macro_ in &parser.macros {
            if let Some(executable) = macro_.parse(tag, self)? {
                trace!(template = %self.name, macro_name = macro_.name(), "parsed block tag");
                return Ok(Some(executable));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::params;
    use crate::template::Executable;
    use lazy_static::lazy_static;

    lazy_static! {
        static ref END_UPPER: Regex = Regex::new(r"^endupper$").unwrap();
    }

    #[derive(Debug)]
    struct Upper(Block);

    impl Executable for Upper {
        fn execute(&self, ctx: &mut Context) -> Result<()> {
            let mut inner = Context::new(ctx.params().clone(), ctx.meta().clone());
            self.0.execute(&mut inner)?;
            ctx.write(inner.render().to_uppercase());
            Ok(())
        }
    }

    struct UpperMacro;

    impl Macro for UpperMacro {
        fn name(&self) -> &str {
            "upper"
        }

        fn parse(&self, tag: &str, run: &mut ParseRun<'_>) -> Result<Option<Box<dyn Executable>>> {
            if tag != "upper" {
                return Ok(None);
            }
            let (_, body) = run.parse_block("upper", "endupper", &END_UPPER)?;
            Ok(Some(Box::new(Upper(body))))
        }
    }

    #[test]
    fn test_segments_follow_tokens() {
        let template = Parser::new().compile_str("a{{ b }}c").unwrap();
        assert_eq!(template.segments().len(), 3);
        assert_eq!(template.name(), STRING_TEMPLATE_NAME);
    }

    #[test]
    fn test_unknown_tag_is_a_compile_error() {
        let err = Parser::new().compile("x\n{% frobnicate %}", "page.txt", params! {}, Meta::default()).unwrap_err();
        match &err {
            TemplateError::Compile { message, name, line, source_context } => {
                assert_eq!(message, "{% frobnicate %} is not a recognized tag.");
                assert_eq!(name, "page.txt");
                assert_eq!(*line, 2);
                assert!(source_context.is_some());
            }
            other => panic!("expected compile error, got {other:?}"),
        }
    }

    #[test]
    fn test_bad_expression_is_a_compile_error() {
        let err = Parser::new().compile_str("\n\n{{ 1 + }}").unwrap_err();
        assert_eq!(err.line(), Some(3));
    }

    #[test]
    fn test_custom_macro() {
        let parser = Parser::new().with_macro(UpperMacro);
        let template = parser
            .compile_str("{% upper %}hi {{ name }}{% endupper %}!")
            .unwrap();
        assert_eq!(template.render(params! { "name" => "bob" }).unwrap(), "HI BOB!");

        let err = parser.compile_str("{% upper %}x").unwrap_err();
        assert_eq!(err.to_string().lines().next().unwrap(), "upper tag could not find a corresponding endupper [__string__ on line 1]");
    }

    #[test]
    fn test_without_macros() {
        assert!(Parser::without_macros().compile_str("{% if x %}{% endif %}").is_err());
    }

    #[test]
    fn test_escape_configuration() {
        let source = "{{ '<b>' }}";
        let parser = Parser::new();
        let html = parser.compile(source, "a.html", params! {}, Meta::default()).unwrap();
        assert_eq!(html.render(params! {}).unwrap(), "&lt;b&gt;");

        let parser = parser.without_escape(".html");
        let html = parser.compile(source, "a.html", params! {}, Meta::default()).unwrap();
        assert_eq!(html.render(params! {}).unwrap(), "<b>");

        let parser = Parser::new().with_escape("txt", Arc::new(|s: &str| s.replace('<', "[")));
        let txt = parser.compile(source, "a.txt", params! {}, Meta::default()).unwrap();
        assert_eq!(txt.render(params! {}).unwrap(), "[b>");
    }

    #[test]
    fn test_custom_syntax() {
        let parser = Parser::new().with_syntax(Syntax::new(("<#", "#>"), ("<<", ">>"), ("<%", "%>")));
        let template = parser.compile_str("<# note #><% if x %><< x >><% endif %>{{ x }}").unwrap();
        assert_eq!(template.render(params! { "x" => 1 }).unwrap(), "1{{ x }}");
    }
}
