// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Builtin functions and the methods of strings, lists and maps.

use crate::error::EvalError;
use crate::value::{Function, Value};
use lazy_static::lazy_static;
use std::cmp::Ordering;
use std::collections::HashMap;

type EvalResult = Result<Value, EvalError>;

lazy_static! {
    static ref BUILTINS: HashMap<&'static str, Function> = {
        let table: [(&'static str, fn(&[Value]) -> EvalResult); 15] = [
            ("range", range),
            ("len", len),
            ("str", to_str),
            ("int", to_int),
            ("float", to_float),
            ("bool", to_bool),
            ("abs", abs),
            ("min", min),
            ("max", max),
            ("sum", sum),
            ("sorted", sorted),
            ("reversed", reversed),
            ("enumerate", enumerate),
            ("zip", zip),
            ("list", list),
        ];
        table
            .into_iter()
            .map(|(name, func)| (name, Function::new(name, func)))
            .collect()
    };
}

/// Returns the builtin function called `name`.
pub(crate) fn function(name: &str) -> Option<Function> {
    BUILTINS.get(name).cloned()
}

fn arity(name: &str, args: &[Value], min: usize, max: usize) -> Result<(), EvalError> {
    if (min..=max).contains(&args.len()) {
        return Ok(());
    }
    let (bound, count) = if min == max {
        ("exactly", min)
    } else if args.len() < min {
        ("at least", min)
    } else {
        ("at most", max)
    };
    Err(EvalError::Type(format!(
        "{}() takes {} {} argument{} ({} given)",
        name,
        bound,
        count,
        if count == 1 { "" } else { "s" },
        args.len()
    )))
}

fn expect_int(name: &str, value: &Value) -> Result<i64, EvalError> {
    match value {
        Value::Int(i) => Ok(*i),
        Value::Bool(b) => Ok(i64::from(*b)),
        other => Err(EvalError::Type(format!(
            "{}() expected an integer, got '{}'",
            name,
            other.type_name()
        ))),
    }
}

fn expect_str<'v>(name: &str, value: &'v Value) -> Result<&'v str, EvalError> {
    value.as_str().ok_or_else(|| {
        EvalError::Type(format!(
            "{}() argument must be str, not {}",
            name,
            value.type_name()
        ))
    })
}

fn range(args: &[Value]) -> EvalResult {
    arity("range", args, 1, 3)?;
    let ints = args
        .iter()
        .map(|arg| expect_int("range", arg))
        .collect::<Result<Vec<_>, _>>()?;
    let (start, stop, step) = match ints[..] {
        [stop] => (0, stop, 1),
        [start, stop] => (start, stop, 1),
        [start, stop, step, ..] => (start, stop, step),
        [] => (0, 0, 1),
    };
    if step == 0 {
        return Err(EvalError::Value("range() arg 3 must not be zero".to_string()));
    }

    let mut items = Vec::new();
    let mut current = start;
    while (step > 0 && current < stop) || (step < 0 && current > stop) {
        items.push(Value::Int(current));
        current = match current.checked_add(step) {
            Some(next) => next,
            None => break,
        };
    }
    Ok(Value::List(items))
}

fn len(args: &[Value]) -> EvalResult {
    arity("len", args, 1, 1)?;
    let count = match &args[0] {
        Value::Str(s) => s.chars().count(),
        Value::List(items) => items.len(),
        Value::Map(map) => map.len(),
        other => {
            return Err(EvalError::Type(format!(
                "object of type '{}' has no len()",
                other.type_name()
            )))
        }
    };
    Ok(Value::from(count))
}

fn to_str(args: &[Value]) -> EvalResult {
    arity("str", args, 0, 1)?;
    Ok(Value::Str(args.first().map(ToString::to_string).unwrap_or_default()))
}

fn to_int(args: &[Value]) -> EvalResult {
    arity("int", args, 0, 1)?;
    match args.first() {
        None => Ok(Value::Int(0)),
        Some(Value::Int(i)) => Ok(Value::Int(*i)),
        Some(Value::Bool(b)) => Ok(Value::Int(i64::from(*b))),
        Some(Value::Float(f)) if f.is_finite() => Ok(Value::Int(f.trunc() as i64)),
        Some(Value::Str(s)) => s.trim().parse::<i64>().map(Value::Int).map_err(|_| {
            EvalError::Value(format!(
                "invalid literal for int() with base 10: {}",
                Value::from(s.as_str()).repr()
            ))
        }),
        Some(other) => Err(EvalError::Type(format!(
            "int() argument must be a string or a number, not '{}'",
            other.type_name()
        ))),
    }
}

fn to_float(args: &[Value]) -> EvalResult {
    arity("float", args, 0, 1)?;
    match args.first() {
        None => Ok(Value::Float(0.0)),
        Some(Value::Str(s)) => s.trim().parse::<f64>().map(Value::Float).map_err(|_| {
            EvalError::Value(format!(
                "could not convert string to float: {}",
                Value::from(s.as_str()).repr()
            ))
        }),
        Some(other) => other.as_number().map(|n| Value::Float(n.as_f64())).ok_or_else(|| {
            EvalError::Type(format!(
                "float() argument must be a string or a number, not '{}'",
                other.type_name()
            ))
        }),
    }
}

fn to_bool(args: &[Value]) -> EvalResult {
    arity("bool", args, 0, 1)?;
    Ok(Value::Bool(args.first().is_some_and(Value::is_truthy)))
}

fn abs(args: &[Value]) -> EvalResult {
    arity("abs", args, 1, 1)?;
    match &args[0] {
        Value::Int(i) => i.checked_abs().map(Value::Int).ok_or(EvalError::Overflow),
        Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
        Value::Float(f) => Ok(Value::Float(f.abs())),
        other => Err(EvalError::Type(format!(
            "bad operand type for abs(): '{}'",
            other.type_name()
        ))),
    }
}

/// Arguments of `min`/`max`: a single iterable, or the values themselves.
fn candidates(name: &str, args: &[Value]) -> Result<Vec<Value>, EvalError> {
    let items = match args {
        [] => return Err(EvalError::Type(format!("{}() expected at least 1 argument, got 0", name))),
        [single] => single.iterate()?,
        many => many.to_vec(),
    };
    if items.is_empty() {
        return Err(EvalError::Value(format!("{}() arg is an empty sequence", name)));
    }
    Ok(items)
}

fn extreme(name: &str, args: &[Value], keep: Ordering) -> EvalResult {
    let mut items = candidates(name, args)?.into_iter();
    let mut best = items.next().unwrap_or_default();
    for item in items {
        if item.try_cmp(&best)? == keep {
            best = item;
        }
    }
    Ok(best)
}

fn min(args: &[Value]) -> EvalResult {
    extreme("min", args, Ordering::Less)
}

fn max(args: &[Value]) -> EvalResult {
    extreme("max", args, Ordering::Greater)
}

fn sum(args: &[Value]) -> EvalResult {
    arity("sum", args, 1, 2)?;
    let start = args.get(1).cloned().unwrap_or(Value::Int(0));
    args[0]
        .iterate()?
        .iter()
        .try_fold(start, |total, item| super::eval::binary(super::ast::BinaryOp::Add, &total, item))
}

fn sorted(args: &[Value]) -> EvalResult {
    arity("sorted", args, 1, 1)?;
    let mut items = args[0].iterate()?;
    let mut failure = None;
    items.sort_by(|a, b| {
        a.try_cmp(b).unwrap_or_else(|err| {
            failure.get_or_insert(err);
            Ordering::Equal
        })
    });
    match failure {
        Some(err) => Err(err),
        None => Ok(Value::List(items)),
    }
}

fn reversed(args: &[Value]) -> EvalResult {
    arity("reversed", args, 1, 1)?;
    let mut items = args[0].iterate()?;
    items.reverse();
    Ok(Value::List(items))
}

fn enumerate(args: &[Value]) -> EvalResult {
    arity("enumerate", args, 1, 2)?;
    let start = args.get(1).map(|v| expect_int("enumerate", v)).transpose()?.unwrap_or(0);
    Ok(Value::List(
        args[0]
            .iterate()?
            .into_iter()
            .zip(start..)
            .map(|(item, index)| Value::List(vec![Value::Int(index), item]))
            .collect(),
    ))
}

fn zip(args: &[Value]) -> EvalResult {
    let columns = args
        .iter()
        .map(Value::iterate)
        .collect::<Result<Vec<_>, _>>()?;
    let rows = columns.iter().map(Vec::len).min().unwrap_or(0);
    Ok(Value::List(
        (0..rows)
            .map(|row| Value::List(columns.iter().map(|column| column[row].clone()).collect()))
            .collect(),
    ))
}

fn list(args: &[Value]) -> EvalResult {
    arity("list", args, 0, 1)?;
    match args.first() {
        None => Ok(Value::List(Vec::new())),
        Some(value) => value.iterate().map(Value::List),
    }
}

/// Calls the method `name` on `target`.
pub(crate) fn call_method(target: &Value, name: &str, args: &[Value]) -> EvalResult {
    match target {
        Value::Str(s) => str_method(s, name, args),
        Value::List(items) => list_method(items, name, args),
        Value::Map(map) => map_method(map, name, args),
        _ => Err(no_attribute(target, name)),
    }
}

fn no_attribute(target: &Value, name: &str) -> EvalError {
    EvalError::Attribute(format!(
        "'{}' object has no attribute '{}'",
        target.type_name(),
        name
    ))
}

fn strip_chars(args: &[Value], name: &str) -> Result<Option<Vec<char>>, EvalError> {
    match args.first() {
        None | Some(Value::None) => Ok(None),
        Some(chars) => Ok(Some(expect_str(name, chars)?.chars().collect())),
    }
}

fn str_method(s: &str, name: &str, args: &[Value]) -> EvalResult {
    match name {
        "upper" => {
            arity(name, args, 0, 0)?;
            Ok(Value::from(s.to_uppercase()))
        }
        "lower" => {
            arity(name, args, 0, 0)?;
            Ok(Value::from(s.to_lowercase()))
        }
        "strip" | "lstrip" | "rstrip" => {
            arity(name, args, 0, 1)?;
            let chars = strip_chars(args, name)?;
            let strip = |c: char| match &chars {
                Some(set) => set.contains(&c),
                None => c.is_whitespace(),
            };
            let stripped = match name {
                "strip" => s.trim_matches(strip),
                "lstrip" => s.trim_start_matches(strip),
                _ => s.trim_end_matches(strip),
            };
            Ok(Value::from(stripped))
        }
        "title" => {
            arity(name, args, 0, 0)?;
            let mut out = String::with_capacity(s.len());
            let mut previous_cased = false;
            for c in s.chars() {
                if previous_cased {
                    out.extend(c.to_lowercase());
                } else {
                    out.extend(c.to_uppercase());
                }
                previous_cased = c.is_alphabetic();
            }
            Ok(Value::from(out))
        }
        "capitalize" => {
            arity(name, args, 0, 0)?;
            let mut chars = s.chars();
            let capitalized: String = match chars.next() {
                Some(first) => {
                    let rest = chars.as_str().to_lowercase();
                    first.to_uppercase().chain(rest.chars()).collect()
                }
                None => String::new(),
            };
            Ok(Value::from(capitalized))
        }
        "startswith" | "endswith" => {
            arity(name, args, 1, 1)?;
            let affix = expect_str(name, &args[0])?;
            Ok(Value::Bool(if name == "startswith" {
                s.starts_with(affix)
            } else {
                s.ends_with(affix)
            }))
        }
        "replace" => {
            arity(name, args, 2, 2)?;
            Ok(Value::from(s.replace(expect_str(name, &args[0])?, expect_str(name, &args[1])?)))
        }
        "split" => {
            arity(name, args, 0, 1)?;
            let parts: Vec<Value> = match args.first() {
                None | Some(Value::None) => s.split_whitespace().map(Value::from).collect(),
                Some(sep) => {
                    let sep = expect_str(name, sep)?;
                    if sep.is_empty() {
                        return Err(EvalError::Value("empty separator".to_string()));
                    }
                    s.split(sep).map(Value::from).collect()
                }
            };
            Ok(Value::List(parts))
        }
        "join" => {
            arity(name, args, 1, 1)?;
            let parts = args[0]
                .iterate()?
                .iter()
                .map(|item| expect_str(name, item).map(str::to_string))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::from(parts.join(s)))
        }
        "find" => {
            arity(name, args, 1, 1)?;
            let needle = expect_str(name, &args[0])?;
            Ok(match s.find(needle) {
                Some(byte) => Value::from(s[..byte].chars().count()),
                None => Value::Int(-1),
            })
        }
        "count" => {
            arity(name, args, 1, 1)?;
            let needle = expect_str(name, &args[0])?;
            if needle.is_empty() {
                return Ok(Value::from(s.chars().count() + 1));
            }
            Ok(Value::from(s.matches(needle).count()))
        }
        _ => Err(no_attribute(&Value::from(s), name)),
    }
}

fn list_method(items: &[Value], name: &str, args: &[Value]) -> EvalResult {
    match name {
        "index" => {
            arity(name, args, 1, 1)?;
            items
                .iter()
                .position(|item| item == &args[0])
                .map(Value::from)
                .ok_or_else(|| EvalError::Value(format!("{} is not in list", args[0].repr())))
        }
        "count" => {
            arity(name, args, 1, 1)?;
            Ok(Value::from(items.iter().filter(|item| *item == &args[0]).count()))
        }
        _ => Err(no_attribute(&Value::List(Vec::new()), name)),
    }
}

fn map_method(map: &crate::value::Map, name: &str, args: &[Value]) -> EvalResult {
    match name {
        "get" => {
            arity(name, args, 1, 2)?;
            let default = args.get(1).cloned().unwrap_or_default();
            Ok(args[0]
                .as_str()
                .and_then(|key| map.get(key))
                .cloned()
                .unwrap_or(default))
        }
        "keys" => {
            arity(name, args, 0, 0)?;
            Ok(Value::List(map.keys().cloned().map(Value::Str).collect()))
        }
        "values" => {
            arity(name, args, 0, 0)?;
            Ok(Value::List(map.values().cloned().collect()))
        }
        "items" => {
            arity(name, args, 0, 0)?;
            Ok(Value::List(
                map.iter()
                    .map(|(key, value)| Value::List(vec![Value::Str(key.clone()), value.clone()]))
                    .collect(),
            ))
        }
        _ => Err(no_attribute(&Value::Map(Default::default()), name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: Vec<Value>) -> EvalResult {
        function(name).unwrap().call(&args)
    }

    #[test]
    fn test_range() {
        assert_eq!(call("range", vec![Value::Int(3)]).unwrap(), Value::from(vec![0, 1, 2]));
        assert_eq!(
            call("range", vec![Value::Int(5), Value::Int(0), Value::Int(-2)]).unwrap(),
            Value::from(vec![5, 3, 1])
        );
        assert!(call("range", vec![Value::Int(1), Value::Int(2), Value::Int(0)]).is_err());
        assert!(call("range", vec![]).is_err());
    }

    #[test]
    fn test_conversions() {
        assert_eq!(call("str", vec![Value::Float(2.0)]).unwrap(), Value::from("2.0"));
        assert_eq!(call("int", vec![Value::from(" 42 ")]).unwrap(), Value::Int(42));
        assert_eq!(call("int", vec![Value::Float(-2.7)]).unwrap(), Value::Int(-2));
        assert_eq!(call("float", vec![Value::Int(1)]).unwrap().to_string(), "1.0");
        assert!(call("int", vec![Value::from("x")]).is_err());
        assert_eq!(call("bool", vec![Value::from("")]).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_aggregates() {
        let items = Value::from(vec![3, 1, 2]);
        assert_eq!(call("len", vec![items.clone()]).unwrap(), Value::Int(3));
        assert_eq!(call("min", vec![items.clone()]).unwrap(), Value::Int(1));
        assert_eq!(call("max", vec![Value::Int(4), Value::Int(9)]).unwrap(), Value::Int(9));
        assert_eq!(call("sum", vec![items.clone()]).unwrap(), Value::Int(6));
        assert_eq!(call("sorted", vec![items.clone()]).unwrap(), Value::from(vec![1, 2, 3]));
        assert_eq!(call("reversed", vec![items]).unwrap(), Value::from(vec![2, 1, 3]));
        assert!(call("max", vec![Value::from(Vec::<Value>::new())]).is_err());
        assert!(call("sorted", vec![Value::List(vec![Value::Int(1), Value::from("a")])]).is_err());
    }

    #[test]
    fn test_pairing() {
        let pairs = call("enumerate", vec![Value::from(vec!["a", "b"])]).unwrap();
        assert_eq!(pairs.to_string(), "[[0, 'a'], [1, 'b']]");
        let zipped = call("zip", vec![Value::from(vec![1, 2, 3]), Value::from("xy")]).unwrap();
        assert_eq!(zipped.to_string(), "[[1, 'x'], [2, 'y']]");
    }

    #[test]
    fn test_string_methods() {
        let s = Value::from("  hello world ");
        assert_eq!(call_method(&s, "strip", &[]).unwrap(), Value::from("hello world"));
        assert_eq!(call_method(&s, "split", &[]).unwrap(), Value::from(vec!["hello", "world"]));
        assert_eq!(
            call_method(&Value::from("hello world"), "title", &[]).unwrap(),
            Value::from("Hello World")
        );
        assert_eq!(
            call_method(&Value::from(", "), "join", &[Value::from(vec!["a", "b"])]).unwrap(),
            Value::from("a, b")
        );
        assert_eq!(
            call_method(&Value::from("xxhixx"), "strip", &[Value::from("x")]).unwrap(),
            Value::from("hi")
        );
        assert_eq!(call_method(&Value::from("abc"), "find", &[Value::from("z")]).unwrap(), Value::Int(-1));
        assert!(matches!(
            call_method(&Value::from("abc"), "nope", &[]),
            Err(EvalError::Attribute(_))
        ));
    }

    #[test]
    fn test_map_methods() {
        let mut map = crate::value::Map::new();
        map.insert("a".to_string(), Value::Int(1));
        let map = Value::Map(map);
        assert_eq!(call_method(&map, "get", &[Value::from("a")]).unwrap(), Value::Int(1));
        assert_eq!(call_method(&map, "get", &[Value::from("b"), Value::Int(0)]).unwrap(), Value::Int(0));
        assert_eq!(call_method(&map, "items", &[]).unwrap().to_string(), "[['a', 1]]");
    }

    #[test]
    fn test_arity_messages() {
        let err = call_method(&Value::from("a"), "upper", &[Value::Int(1)]).unwrap_err();
        assert_eq!(err.to_string(), "upper() takes exactly 0 arguments (1 given)");
    }
}
