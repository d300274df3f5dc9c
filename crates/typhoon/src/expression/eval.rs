// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Tree-walking evaluation of expression ASTs.

use super::ast::{BinaryOp, Expr, UnaryOp};
use super::builtins;
use crate::context::Context;
use crate::error::EvalError;
use crate::value::{Map, Number, Value};
use std::cmp::Ordering;

type EvalResult = Result<Value, EvalError>;

/// Evaluates `expr` against the scopes of `ctx`.
pub(crate) fn evaluate(expr: &Expr, ctx: &Context) -> EvalResult {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Name(name) => lookup(name, ctx),
        Expr::List(items) => Ok(Value::List(
            items
                .iter()
                .map(|item| evaluate(item, ctx))
                .collect::<Result<_, _>>()?,
        )),
        Expr::Dict(entries) => {
            let mut map = Map::with_capacity(entries.len());
            for (key, value) in entries {
                let key = match evaluate(key, ctx)? {
                    Value::Str(s) => s,
                    other => {
                        return Err(EvalError::Type(format!(
                            "dict keys must be str, not {}",
                            other.type_name()
                        )))
                    }
                };
                map.insert(key, evaluate(value, ctx)?);
            }
            Ok(Value::Map(map))
        }
        Expr::Attribute { target, name } => get_attribute(&evaluate(target, ctx)?, name),
        Expr::Index { target, index } => get_item(&evaluate(target, ctx)?, &evaluate(index, ctx)?),
        Expr::Slice { target, lower, upper } => {
            let target = evaluate(target, ctx)?;
            let lower = lower.as_deref().map(|e| evaluate(e, ctx)).transpose()?;
            let upper = upper.as_deref().map(|e| evaluate(e, ctx)).transpose()?;
            slice(&target, lower.as_ref(), upper.as_ref())
        }
        Expr::Call { callee, args } => {
            let args = args
                .iter()
                .map(|arg| evaluate(arg, ctx))
                .collect::<Result<Vec<_>, _>>()?;
            call(callee, &args, ctx)
        }
        Expr::Unary { op, operand } => unary(*op, evaluate(operand, ctx)?),
        Expr::Binary { op: BinaryOp::And, left, right } => {
            let left = evaluate(left, ctx)?;
            if left.is_truthy() {
                evaluate(right, ctx)
            } else {
                Ok(left)
            }
        }
        Expr::Binary { op: BinaryOp::Or, left, right } => {
            let left = evaluate(left, ctx)?;
            if left.is_truthy() {
                Ok(left)
            } else {
                evaluate(right, ctx)
            }
        }
        Expr::Binary { op, left, right } => binary(*op, &evaluate(left, ctx)?, &evaluate(right, ctx)?),
        Expr::Conditional { condition, then, otherwise } => {
            if evaluate(condition, ctx)?.is_truthy() {
                evaluate(then, ctx)
            } else {
                evaluate(otherwise, ctx)
            }
        }
    }
}

fn lookup(name: &str, ctx: &Context) -> EvalResult {
    if let Some(value) = ctx.lookup(name) {
        return Ok(value);
    }
    builtins::function(name)
        .map(Value::Function)
        .ok_or_else(|| EvalError::UndefinedName(name.to_string()))
}

fn call(callee: &Expr, args: &[Value], ctx: &Context) -> EvalResult {
    if let Expr::Attribute { target, name } = callee {
        let target = evaluate(target, ctx)?;
        // A function stored in a map is called, anything else is a method.
        if let Value::Map(map) = &target {
            if let Some(Value::Function(func)) = map.get(name) {
                return func.call(args);
            }
        }
        return builtins::call_method(&target, name, args);
    }

    match evaluate(callee, ctx)? {
        Value::Function(func) => func.call(args),
        other => Err(EvalError::Type(format!(
            "'{}' object is not callable",
            other.type_name()
        ))),
    }
}

fn get_attribute(target: &Value, name: &str) -> EvalResult {
    match target {
        Value::Map(map) => map.get(name).cloned().ok_or_else(|| {
            EvalError::Attribute(format!("'dict' object has no attribute '{}'", name))
        }),
        Value::Template(template) if name == "name" => Ok(Value::from(template.name())),
        other => Err(EvalError::Attribute(format!(
            "'{}' object has no attribute '{}'",
            other.type_name(),
            name
        ))),
    }
}

/// Resolves a possibly negative index against a sequence of `len` items.
fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let index = if index < 0 { index + len } else { index };
    (0..len).contains(&index).then(|| index as usize)
}

fn get_item(target: &Value, index: &Value) -> EvalResult {
    match (target, index) {
        (Value::List(items), Value::Int(i)) => normalize_index(*i, items.len())
            .map(|i| items[i].clone())
            .ok_or_else(|| EvalError::Index("list index out of range".to_string())),
        (Value::Str(s), Value::Int(i)) => {
            let chars: Vec<char> = s.chars().collect();
            normalize_index(*i, chars.len())
                .map(|i| Value::Str(chars[i].to_string()))
                .ok_or_else(|| EvalError::Index("string index out of range".to_string()))
        }
        (Value::Map(map), Value::Str(key)) => map
            .get(key)
            .cloned()
            .ok_or_else(|| EvalError::Key(index.repr())),
        (Value::Map(_), other) => Err(EvalError::Key(other.repr())),
        (Value::List(_) | Value::Str(_), other) => Err(EvalError::Type(format!(
            "{} indices must be integers, not {}",
            target.type_name(),
            other.type_name()
        ))),
        (other, _) => Err(EvalError::Type(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}

fn slice_bounds(lower: Option<&Value>, upper: Option<&Value>, len: usize) -> Result<(usize, usize), EvalError> {
    let clamp = |bound: Option<&Value>, default: usize| -> Result<usize, EvalError> {
        match bound {
            None | Some(Value::None) => Ok(default),
            Some(Value::Int(i)) => {
                let len = len as i64;
                let i = if *i < 0 { (*i + len).max(0) } else { (*i).min(len) };
                Ok(i as usize)
            }
            Some(other) => Err(EvalError::Type(format!(
                "slice indices must be integers or None, not {}",
                other.type_name()
            ))),
        }
    };
    let start = clamp(lower, 0)?;
    let end = clamp(upper, len)?;
    Ok((start, end.max(start)))
}

fn slice(target: &Value, lower: Option<&Value>, upper: Option<&Value>) -> EvalResult {
    match target {
        Value::List(items) => {
            let (start, end) = slice_bounds(lower, upper, items.len())?;
            Ok(Value::List(items[start..end].to_vec()))
        }
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let (start, end) = slice_bounds(lower, upper, chars.len())?;
            Ok(Value::Str(chars[start..end].iter().collect()))
        }
        other => Err(EvalError::Type(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}

fn unary(op: UnaryOp, operand: Value) -> EvalResult {
    match op {
        UnaryOp::Not => Ok(Value::Bool(!operand.is_truthy())),
        UnaryOp::Pos => match operand.as_number() {
            Some(Number::Int(i)) => Ok(Value::Int(i)),
            Some(Number::Float(f)) => Ok(Value::Float(f)),
            None => Err(bad_unary("+", &operand)),
        },
        UnaryOp::Neg => match operand.as_number() {
            Some(Number::Int(i)) => i.checked_neg().map(Value::Int).ok_or(EvalError::Overflow),
            Some(Number::Float(f)) => Ok(Value::Float(-f)),
            None => Err(bad_unary("-", &operand)),
        },
    }
}

fn bad_unary(symbol: &str, operand: &Value) -> EvalError {
    EvalError::Type(format!(
        "bad operand type for unary {}: '{}'",
        symbol,
        operand.type_name()
    ))
}

fn unsupported(op: BinaryOp, left: &Value, right: &Value) -> EvalError {
    EvalError::Type(format!(
        "unsupported operand type(s) for {}: '{}' and '{}'",
        op.symbol(),
        left.type_name(),
        right.type_name()
    ))
}

pub(crate) fn binary(op: BinaryOp, left: &Value, right: &Value) -> EvalResult {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(left == right)),
        BinaryOp::Ne => Ok(Value::Bool(left != right)),
        BinaryOp::Lt => Ok(Value::Bool(left.try_cmp(right)? == Ordering::Less)),
        BinaryOp::Le => Ok(Value::Bool(left.try_cmp(right)? != Ordering::Greater)),
        BinaryOp::Gt => Ok(Value::Bool(left.try_cmp(right)? == Ordering::Greater)),
        BinaryOp::Ge => Ok(Value::Bool(left.try_cmp(right)? != Ordering::Less)),
        BinaryOp::In => contains(right, left).map(Value::Bool),
        BinaryOp::NotIn => contains(right, left).map(|found| Value::Bool(!found)),
        BinaryOp::Is => Ok(Value::Bool(identical(left, right))),
        BinaryOp::IsNot => Ok(Value::Bool(!identical(left, right))),
        BinaryOp::Add => match (left, right) {
            (Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{}{}", a, b))),
            (Value::List(a), Value::List(b)) => Ok(Value::List(a.iter().chain(b).cloned().collect())),
            _ => arithmetic(op, left, right),
        },
        BinaryOp::Mul => match (left, right) {
            (Value::Str(s), Value::Int(n)) | (Value::Int(n), Value::Str(s)) => {
                let count = repeat_count(*n, s.len(), 1)?;
                Ok(Value::Str(s.repeat(count)))
            }
            (Value::List(items), Value::Int(n)) | (Value::Int(n), Value::List(items)) => {
                let count = repeat_count(*n, items.len(), std::mem::size_of::<Value>())?;
                Ok(Value::List(
                    std::iter::repeat(items.iter().cloned()).take(count).flatten().collect(),
                ))
            }
            _ => arithmetic(op, left, right),
        },
        BinaryOp::Sub | BinaryOp::Div | BinaryOp::FloorDiv | BinaryOp::Mod | BinaryOp::Pow => {
            arithmetic(op, left, right)
        }
        // Short-circuit operators are handled before operand evaluation.
        BinaryOp::And => Ok(if left.is_truthy() { right.clone() } else { left.clone() }),
        BinaryOp::Or => Ok(if left.is_truthy() { left.clone() } else { right.clone() }),
    }
}

/// Repetitions for `seq * n`; an empty sequence repeats zero times.
fn repeat_count(n: i64, len: usize, item_size: usize) -> Result<usize, EvalError> {
    let count = usize::try_from(n).unwrap_or(0);
    if len == 0 {
        return Ok(0);
    }
    count
        .checked_mul(len)
        .and_then(|total| total.checked_mul(item_size))
        .filter(|bytes| *bytes <= isize::MAX as usize)
        .map(|_| count)
        .ok_or(EvalError::Overflow)
}

fn contains(container: &Value, item: &Value) -> Result<bool, EvalError> {
    match container {
        Value::Str(haystack) => match item {
            Value::Str(needle) => Ok(haystack.contains(needle.as_str())),
            other => Err(EvalError::Type(format!(
                "'in <string>' requires string as left operand, not {}",
                other.type_name()
            ))),
        },
        Value::List(items) => Ok(items.contains(item)),
        Value::Map(map) => Ok(item.as_str().is_some_and(|key| map.contains_key(key))),
        other => Err(EvalError::Type(format!(
            "argument of type '{}' is not iterable",
            other.type_name()
        ))),
    }
}

fn identical(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::None, Value::None) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Template(_), Value::Template(_)) | (Value::Function(_), Value::Function(_)) => left == right,
        _ => false,
    }
}

fn arithmetic(op: BinaryOp, left: &Value, right: &Value) -> EvalResult {
    let (a, b) = match (left.as_number(), right.as_number()) {
        (Some(a), Some(b)) => (a, b),
        _ => return Err(unsupported(op, left, right)),
    };

    if let (Number::Int(a), Number::Int(b)) = (a, b) {
        return int_arithmetic(op, a, b);
    }

    let (a, b) = (a.as_f64(), b.as_f64());
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div if b == 0.0 => return Err(EvalError::ZeroDivision),
        BinaryOp::Div => a / b,
        BinaryOp::FloorDiv if b == 0.0 => return Err(EvalError::ZeroDivision),
        BinaryOp::FloorDiv => (a / b).floor(),
        BinaryOp::Mod if b == 0.0 => return Err(EvalError::ZeroDivision),
        BinaryOp::Mod => a - b * (a / b).floor(),
        BinaryOp::Pow if a == 0.0 && b < 0.0 => return Err(EvalError::ZeroDivision),
        BinaryOp::Pow => a.powf(b),
        _ => return Err(unsupported(op, left, right)),
    };
    Ok(Value::Float(result))
}

fn int_arithmetic(op: BinaryOp, a: i64, b: i64) -> EvalResult {
    let result = match op {
        BinaryOp::Add => a.checked_add(b),
        BinaryOp::Sub => a.checked_sub(b),
        BinaryOp::Mul => a.checked_mul(b),
        BinaryOp::Div if b == 0 => return Err(EvalError::ZeroDivision),
        BinaryOp::Div => return Ok(Value::Float(a as f64 / b as f64)),
        BinaryOp::FloorDiv | BinaryOp::Mod if b == 0 => return Err(EvalError::ZeroDivision),
        // Integer division and modulo round towards negative infinity.
        BinaryOp::FloorDiv => a.checked_div(b).map(|q| {
            if a % b != 0 && (a < 0) != (b < 0) {
                q - 1
            } else {
                q
            }
        }),
        BinaryOp::Mod => a.checked_rem(b).map(|r| {
            if r != 0 && (r < 0) != (b < 0) {
                r + b
            } else {
                r
            }
        }),
        BinaryOp::Pow if a == 0 && b < 0 => return Err(EvalError::ZeroDivision),
        BinaryOp::Pow if b < 0 => return Ok(Value::Float((a as f64).powf(b as f64))),
        BinaryOp::Pow => u32::try_from(b).ok().and_then(|exp| a.checked_pow(exp)),
        _ => None,
    };
    result.map(Value::Int).ok_or(EvalError::Overflow)
}
