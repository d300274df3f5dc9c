// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Expression parser: pest grammar plus Pratt precedence climbing.

use super::ast::{BinaryOp, Expr, UnaryOp};
use crate::error::{Result, TemplateError};
use crate::value::Value;
use lazy_static::lazy_static;
use pest::iterators::Pair;
use pest::pratt_parser::{Assoc, Op, PrattParser};
use pest::Parser;
use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "expression/expression.pest"]
struct ExpressionParser;

lazy_static! {
    // Lowest precedence first.
    static ref PRATT: PrattParser<Rule> = PrattParser::new()
        .op(Op::infix(Rule::op_or, Assoc::Left))
        .op(Op::infix(Rule::op_and, Assoc::Left))
        .op(Op::prefix(Rule::op_not))
        .op(Op::infix(Rule::op_in, Assoc::Left)
            | Op::infix(Rule::op_not_in, Assoc::Left)
            | Op::infix(Rule::op_is, Assoc::Left)
            | Op::infix(Rule::op_is_not, Assoc::Left)
            | Op::infix(Rule::op_eq, Assoc::Left)
            | Op::infix(Rule::op_ne, Assoc::Left)
            | Op::infix(Rule::op_lt, Assoc::Left)
            | Op::infix(Rule::op_le, Assoc::Left)
            | Op::infix(Rule::op_gt, Assoc::Left)
            | Op::infix(Rule::op_ge, Assoc::Left))
        .op(Op::infix(Rule::op_add, Assoc::Left) | Op::infix(Rule::op_sub, Assoc::Left))
        .op(Op::infix(Rule::op_mul, Assoc::Left)
            | Op::infix(Rule::op_div, Assoc::Left)
            | Op::infix(Rule::op_floordiv, Assoc::Left)
            | Op::infix(Rule::op_mod, Assoc::Left))
        .op(Op::prefix(Rule::op_neg) | Op::prefix(Rule::op_pos))
        .op(Op::infix(Rule::op_pow, Assoc::Right));
}

/// Parses a complete expression.
pub fn parse_expression(text: &str) -> Result<Expr> {
    let mut pairs = ExpressionParser::parse(Rule::expression, text)
        .map_err(|e| syntax_error(text, &e))?;
    let expression = next_inner(&mut pairs)?;
    let expr = next_inner(&mut expression.into_inner())?;
    build_expr(expr)
}

/// Parses the comma separated names bound by a `for` tag.
pub fn parse_targets(text: &str) -> Result<Vec<String>> {
    let mut pairs = ExpressionParser::parse(Rule::target_list, text)
        .map_err(|e| syntax_error(text, &e))?;
    let list = next_inner(&mut pairs)?;
    Ok(list
        .into_inner()
        .filter(|p| p.as_rule() == Rule::identifier)
        .map(|p| p.as_str().to_string())
        .collect())
}

fn syntax_error(text: &str, err: &pest::error::Error<Rule>) -> TemplateError {
    let column = match err.line_col {
        pest::error::LineColLocation::Pos((_, col)) => col,
        pest::error::LineColLocation::Span((_, col), _) => col,
    };
    TemplateError::Syntax(format!(
        "invalid syntax in `{}` at column {}: {}",
        text,
        column,
        err.variant.message()
    ))
}

fn next_inner<'i>(pairs: &mut pest::iterators::Pairs<'i, Rule>) -> Result<Pair<'i, Rule>> {
    pairs
        .next()
        .ok_or_else(|| TemplateError::Syntax("unexpected end of expression".to_string()))
}

fn unexpected(pair: &Pair<'_, Rule>) -> TemplateError {
    TemplateError::Syntax(format!("unexpected {:?} in expression: {}", pair.as_rule(), pair.as_str()))
}

fn build_expr(pair: Pair<'_, Rule>) -> Result<Expr> {
    let mut parts = pair
        .into_inner()
        .filter(|p| !matches!(p.as_rule(), Rule::kw_if | Rule::kw_else));
    let value = build_operation(next_inner_of(&mut parts)?)?;
    match (parts.next(), parts.next()) {
        (None, _) => Ok(value),
        (Some(condition), Some(otherwise)) => Ok(Expr::Conditional {
            condition: Box::new(build_operation(condition)?),
            then: Box::new(value),
            otherwise: Box::new(build_expr(otherwise)?),
        }),
        (Some(dangling), None) => Err(unexpected(&dangling)),
    }
}

fn next_inner_of<'i>(parts: &mut impl Iterator<Item = Pair<'i, Rule>>) -> Result<Pair<'i, Rule>> {
    parts
        .next()
        .ok_or_else(|| TemplateError::Syntax("unexpected end of expression".to_string()))
}

fn build_operation(pair: Pair<'_, Rule>) -> Result<Expr> {
    PRATT
        .map_primary(build_postfixed)
        .map_prefix(|op, operand| {
            let op = match op.as_rule() {
                Rule::op_neg => UnaryOp::Neg,
                Rule::op_pos => UnaryOp::Pos,
                Rule::op_not => UnaryOp::Not,
                _ => return Err(unexpected(&op)),
            };
            Ok(Expr::Unary {
                op,
                operand: Box::new(operand?),
            })
        })
        .map_infix(|left, op, right| {
            let op = match op.as_rule() {
                Rule::op_or => BinaryOp::Or,
                Rule::op_and => BinaryOp::And,
                Rule::op_in => BinaryOp::In,
                Rule::op_not_in => BinaryOp::NotIn,
                Rule::op_is => BinaryOp::Is,
                Rule::op_is_not => BinaryOp::IsNot,
                Rule::op_eq => BinaryOp::Eq,
                Rule::op_ne => BinaryOp::Ne,
                Rule::op_lt => BinaryOp::Lt,
                Rule::op_le => BinaryOp::Le,
                Rule::op_gt => BinaryOp::Gt,
                Rule::op_ge => BinaryOp::Ge,
                Rule::op_add => BinaryOp::Add,
                Rule::op_sub => BinaryOp::Sub,
                Rule::op_mul => BinaryOp::Mul,
                Rule::op_div => BinaryOp::Div,
                Rule::op_floordiv => BinaryOp::FloorDiv,
                Rule::op_mod => BinaryOp::Mod,
                Rule::op_pow => BinaryOp::Pow,
                _ => return Err(unexpected(&op)),
            };
            Ok(Expr::Binary {
                op,
                left: Box::new(left?),
                right: Box::new(right?),
            })
        })
        .parse(pair.into_inner())
}

fn build_postfixed(pair: Pair<'_, Rule>) -> Result<Expr> {
    let mut inner = pair.into_inner();
    let mut expr = build_primary(next_inner(&mut inner)?)?;

    for postfix in inner {
        expr = match postfix.as_rule() {
            Rule::call => Expr::Call {
                callee: Box::new(expr),
                args: postfix.into_inner().map(build_expr).collect::<Result<_>>()?,
            },
            Rule::attribute => Expr::Attribute {
                target: Box::new(expr),
                name: next_inner(&mut postfix.into_inner())?.as_str().to_string(),
            },
            Rule::index => {
                let subscript = next_inner(&mut postfix.into_inner())?;
                if subscript.as_rule() == Rule::slice {
                    let mut lower = None;
                    let mut upper = None;
                    for bound in subscript.into_inner() {
                        let rule = bound.as_rule();
                        let value = Some(Box::new(build_expr(next_inner(&mut bound.into_inner())?)?));
                        match rule {
                            Rule::slice_lower => lower = value,
                            _ => upper = value,
                        }
                    }
                    Expr::Slice {
                        target: Box::new(expr),
                        lower,
                        upper,
                    }
                } else {
                    Expr::Index {
                        target: Box::new(expr),
                        index: Box::new(build_expr(subscript)?),
                    }
                }
            }
            _ => return Err(unexpected(&postfix)),
        };
    }

    Ok(expr)
}

fn build_primary(pair: Pair<'_, Rule>) -> Result<Expr> {
    match pair.as_rule() {
        Rule::int => pair
            .as_str()
            .parse::<i64>()
            .map(|i| Expr::Literal(Value::Int(i)))
            .map_err(|_| TemplateError::Syntax(format!("integer literal too large: {}", pair.as_str()))),
        Rule::float => pair
            .as_str()
            .parse::<f64>()
            .map(|f| Expr::Literal(Value::Float(f)))
            .map_err(|_| TemplateError::Syntax(format!("invalid float literal: {}", pair.as_str()))),
        Rule::strings => {
            let mut text = String::new();
            for string in pair.into_inner() {
                if let Some(body) = string.into_inner().next() {
                    unescape_into(body.as_str(), &mut text);
                }
            }
            Ok(Expr::Literal(Value::Str(text)))
        }
        Rule::kw_true => Ok(Expr::Literal(Value::Bool(true))),
        Rule::kw_false => Ok(Expr::Literal(Value::Bool(false))),
        Rule::kw_none => Ok(Expr::Literal(Value::None)),
        Rule::identifier => Ok(Expr::Name(pair.as_str().to_string())),
        Rule::paren => build_expr(next_inner(&mut pair.into_inner())?),
        Rule::tuple | Rule::list => Ok(Expr::List(
            pair.into_inner().map(build_expr).collect::<Result<_>>()?,
        )),
        Rule::dict => {
            let mut entries = Vec::new();
            for entry in pair.into_inner() {
                let mut kv = entry.into_inner();
                let key = build_expr(next_inner(&mut kv)?)?;
                let value = build_expr(next_inner(&mut kv)?)?;
                entries.push((key, value));
            }
            Ok(Expr::Dict(entries))
        }
        _ => Err(unexpected(&pair)),
    }
}

fn unescape_into(raw: &str, out: &mut String) {
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(c @ ('\\' | '\'' | '"')) => out.push(c),
            // A backslash-newline continues the literal on the next line.
            Some('\n') => {}
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
}
