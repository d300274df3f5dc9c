// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Template tokenizer.
//!
//! The lexer scans the source with one combined pattern that matches, in
//! priority order, a comment, an expression tag and a block tag. Text between
//! matches becomes [`TokenKind::Text`]. Comments are dropped but still count
//! towards line numbers.
//!
//! Tokens are produced lazily by the [`Lexer`] iterator.

use lazy_static::lazy_static;
use regex::{CaptureMatches, Regex};
use std::fmt;
use std::ops::Range;

lazy_static! {
    static ref DEFAULT_PATTERN: Regex = Syntax::build_pattern(
        ("{#", "#}"),
        ("{{", "}}"),
        ("{%", "%}"),
    );
}

/// The kind of a template token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Literal text copied to the output verbatim.
    Text,
    /// An expression tag, `{{ ... }}` by default.
    Expression,
    /// A block tag, `{% ... %}` by default.
    Block,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Text => write!(f, "text"),
            TokenKind::Expression => write!(f, "expression"),
            TokenKind::Block => write!(f, "block"),
        }
    }
}

/// A single token cut from template source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Line the token starts on (1-indexed).
    pub line: usize,
    /// What the token represents.
    pub kind: TokenKind,
    /// Text for [`TokenKind::Text`], trimmed tag content otherwise.
    pub content: String,
    /// Byte range of the whole token in the source, delimiters included.
    pub span: Range<usize>,
}

/// Delimiter configuration for the lexer.
///
/// Each pair is an (open, close) delimiter. The default syntax is
/// `{# #}` for comments, `{{ }}` for expressions and `{% %}` for blocks.
#[derive(Debug, Clone)]
pub struct Syntax {
    comment: (String, String),
    expression: (String, String),
    block: (String, String),
    pattern: Option<Regex>,
}

impl Default for Syntax {
    fn default() -> Self {
        Self {
            comment: ("{#".into(), "#}".into()),
            expression: ("{{".into(), "}}".into()),
            block: ("{%".into(), "%}".into()),
            pattern: None,
        }
    }
}

impl Syntax {
    /// Creates a syntax with custom delimiters.
    pub fn new(
        comment: (&str, &str),
        expression: (&str, &str),
        block: (&str, &str),
    ) -> Self {
        let pattern = Self::build_pattern(comment, expression, block);
        Self {
            comment: (comment.0.into(), comment.1.into()),
            expression: (expression.0.into(), expression.1.into()),
            block: (block.0.into(), block.1.into()),
            pattern: Some(pattern),
        }
    }

    fn build_pattern(comment: (&str, &str), expression: (&str, &str), block: (&str, &str)) -> Regex {
        let source = format!(
            r"(?s){}.*?{}|{}\s*(.*?)\s*{}|{}\s*(.*?)\s*{}",
            regex::escape(comment.0),
            regex::escape(comment.1),
            regex::escape(expression.0),
            regex::escape(expression.1),
            regex::escape(block.0),
            regex::escape(block.1),
        );
        // Only literal delimiters are interpolated, so the pattern is always valid.
        Regex::new(&source).expect("escaped delimiters form a valid pattern")
    }

    /// Returns the compiled token pattern.
    pub fn pattern(&self) -> &Regex {
        self.pattern.as_ref().unwrap_or(&DEFAULT_PATTERN)
    }

    /// Returns the comment delimiters.
    pub fn comment(&self) -> (&str, &str) {
        (&self.comment.0, &self.comment.1)
    }

    /// Returns the expression delimiters.
    pub fn expression(&self) -> (&str, &str) {
        (&self.expression.0, &self.expression.1)
    }

    /// Returns the block delimiters.
    pub fn block(&self) -> (&str, &str) {
        (&self.block.0, &self.block.1)
    }

    /// Tokenizes `source` with this syntax.
    pub fn tokenize<'s>(&'s self, source: &'s str) -> Lexer<'s> {
        Lexer::with_pattern(self.pattern(), source)
    }
}

/// Tokenizes `source` with the default syntax.
pub fn tokenize(source: &str) -> Lexer<'_> {
    Lexer::with_pattern(&DEFAULT_PATTERN, source)
}

/// Lazy token iterator over a template source.
pub struct Lexer<'s> {
    source: &'s str,
    matches: CaptureMatches<'s, 's>,
    index: usize,
    line: usize,
    pending: Option<Token>,
}

impl<'s> Lexer<'s> {
    fn with_pattern(pattern: &'s Regex, source: &'s str) -> Self {
        Self {
            source,
            matches: pattern.captures_iter(source),
            index: 0,
            line: 1,
            pending: None,
        }
    }

    fn text_token(&mut self, end: usize) -> Token {
        let content = &self.source[self.index..end];
        let token = Token {
            line: self.line,
            kind: TokenKind::Text,
            content: content.to_string(),
            span: self.index..end,
        };
        self.line += content.matches('\n').count();
        self.index = end;
        token
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if let Some(token) = self.pending.take() {
            return Some(token);
        }

        while let Some(caps) = self.matches.next() {
            let whole = caps.get(0)?;
            let leading = (whole.start() > self.index).then(|| self.text_token(whole.start()));

            let tag = match (caps.get(1), caps.get(2)) {
                (Some(m), _) if !m.as_str().is_empty() => Some((TokenKind::Expression, m.as_str())),
                (_, Some(m)) if !m.as_str().is_empty() => Some((TokenKind::Block, m.as_str())),
                _ => None,
            };
            let tag = tag.map(|(kind, content)| Token {
                line: self.line,
                kind,
                content: content.to_string(),
                span: whole.range(),
            });

            self.line += whole.as_str().matches('\n').count();
            self.index = whole.end();

            match (leading, tag) {
                (Some(text), tag) => {
                    self.pending = tag;
                    return Some(text);
                }
                (None, Some(tag)) => return Some(tag),
                // A comment or an empty tag: nothing to emit, keep scanning.
                (None, None) => continue,
            }
        }

        (self.index < self.source.len()).then(|| self.text_token(self.source.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<(usize, TokenKind, String)> {
        tokenize(source).map(|t| (t.line, t.kind, t.content)).collect()
    }

    #[test]
    fn test_plain_text_is_one_token() {
        assert_eq!(
            kinds("hello\tworld\n中文"),
            vec![(1, TokenKind::Text, "hello\tworld\n中文".to_string())]
        );
    }

    #[test]
    fn test_tags_are_trimmed() {
        assert_eq!(
            kinds("a{{  name }}b{%if x   %}"),
            vec![
                (1, TokenKind::Text, "a".to_string()),
                (1, TokenKind::Expression, "name".to_string()),
                (1, TokenKind::Text, "b".to_string()),
                (1, TokenKind::Block, "if x".to_string()),
            ]
        );
    }

    #[test]
    fn test_comments_are_dropped_but_count_lines() {
        assert_eq!(
            kinds("{# one\ntwo\n#}x\n{{ y }}"),
            vec![
                (3, TokenKind::Text, "x\n".to_string()),
                (4, TokenKind::Expression, "y".to_string()),
            ]
        );
    }

    #[test]
    fn test_multiline_tags_advance_lines() {
        let tokens = kinds("{{ ('a'\n'b') }}{% if x %}");
        assert_eq!(tokens[0], (1, TokenKind::Expression, "('a'\n'b')".to_string()));
        assert_eq!(tokens[1], (2, TokenKind::Block, "if x".to_string()));
    }

    #[test]
    fn test_empty_tags_are_skipped() {
        assert_eq!(kinds("a{{ }}b{%%}"), vec![
            (1, TokenKind::Text, "a".to_string()),
            (1, TokenKind::Text, "b".to_string()),
        ]);
    }

    #[test]
    fn test_spans_partition_source_without_comments() {
        let source = "<p>{{ name }}</p>\n{% for x in y %}\n  {{x}}{% endfor %}tail";
        let rebuilt: String = tokenize(source).map(|t| &source[t.span]).collect();
        assert_eq!(rebuilt, source);
    }

    #[test]
    fn test_spans_skip_only_comments() {
        let source = "a{# note #}b{{ c }}";
        let spans: Vec<_> = tokenize(source).map(|t| t.span).collect();
        assert_eq!(spans, vec![0..1, 11..12, 12..19]);
    }

    #[test]
    fn test_custom_syntax() {
        let syntax = Syntax::new(("<#", "#>"), ("[[", "]]"), ("<%", "%>"));
        let tokens: Vec<_> = syntax
            .tokenize("<# hidden #>[[ a ]]{{ b }}<% if a %>")
            .map(|t| (t.kind, t.content))
            .collect();
        assert_eq!(
            tokens,
            vec![
                (TokenKind::Expression, "a".to_string()),
                (TokenKind::Text, "{{ b }}".to_string()),
                (TokenKind::Block, "if a".to_string()),
            ]
        );
    }

    #[test]
    fn test_lexer_restarts_by_reinvocation() {
        let source = "x{{ y }}";
        assert_eq!(tokenize(source).count(), 2);
        assert_eq!(tokenize(source).count(), 2);
    }
}
