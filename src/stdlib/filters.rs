use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::filters::Thunk;
use crate::value::Value;
use chrono::NaiveDateTime;
use std::cmp::Ordering;
use std::fmt::Write;

pub(super) fn register(engine: &Engine) -> Result<()> {
    // strings
    engine.register_filter("append", |a: String, b: String| a + &b)?;
    engine.register_filter("prepend", |a: String, b: String| b + &a)?;
    engine.register_filter("capitalize", capitalize)?;
    engine.register_filter("downcase", |s: String| s.to_lowercase())?;
    engine.register_filter("upcase", |s: String| s.to_uppercase())?;
    engine.register_filter("strip", |s: String| s.trim().to_string())?;
    engine.register_filter("lstrip", |s: String| s.trim_start().to_string())?;
    engine.register_filter("rstrip", |s: String| s.trim_end().to_string())?;
    engine.register_filter("replace", |s: String, from: String, to: String| {
        s.replace(&from, &to)
    })?;
    engine.register_filter("remove", |s: String, sub: String| s.replace(&sub, ""))?;
    engine.register_filter("split", split)?;
    engine.register_filter("truncate", truncate)?;

    // lists
    engine.register_filter("join", |list: Vec<Value>, sep: Thunk<String>| {
        let sep = sep.call(" ".to_string());
        list.iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(&sep)
    })?;
    engine.register_filter("size", |v: Value| v.size().unwrap_or(0))?;
    engine.register_filter("first", |v: Value| match v {
        Value::List(l) => l.into_iter().next().unwrap_or(Value::Nil),
        _ => Value::Nil,
    })?;
    engine.register_filter("last", |v: Value| match v {
        Value::List(l) => l.into_iter().last().unwrap_or(Value::Nil),
        _ => Value::Nil,
    })?;
    engine.register_filter("reverse", |mut list: Vec<Value>| {
        list.reverse();
        list
    })?;
    engine.register_filter("sort", |mut list: Vec<Value>| {
        list.sort_by(sort_order);
        list
    })?;
    engine.register_filter("uniq", uniq)?;
    engine.register_filter("default", |v: Value, fallback: Value| {
        if is_blank(&v) { fallback } else { v }
    })?;

    // math
    engine.register_filter("plus", |a: Value, b: Value| {
        arithmetic("plus", &a, &b, i64::checked_add, |x, y| x + y)
    })?;
    engine.register_filter("minus", |a: Value, b: Value| {
        arithmetic("minus", &a, &b, i64::checked_sub, |x, y| x - y)
    })?;
    engine.register_filter("times", |a: Value, b: Value| {
        arithmetic("times", &a, &b, i64::checked_mul, |x, y| x * y)
    })?;
    engine.register_filter("divided_by", divided_by)?;
    engine.register_filter("modulo", modulo)?;
    engine.register_filter("abs", |v: Value| -> Result<Value> {
        Ok(match number("abs", 0, &v)? {
            Number::Int(n) => Value::Int(n.saturating_abs()),
            Number::Float(f) => Value::Float(f.abs()),
        })
    })?;

    // dates
    engine.register_filter("date", date)?;
    Ok(())
}

fn capitalize(s: String) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => s,
    }
}

fn split(s: String, sep: String) -> Vec<Value> {
    if sep.is_empty() {
        return s.chars().map(|c| Value::Str(c.to_string())).collect();
    }
    s.split(sep.as_str())
        .map(|part| Value::Str(part.to_string()))
        .collect()
}

/// Shortens to `length` chars including the ellipsis.
fn truncate(s: String, length: Thunk<usize>, ellipsis: Thunk<String>) -> String {
    let length = length.call(50);
    let ellipsis = ellipsis.call("...".to_string());
    if s.chars().count() <= length {
        return s;
    }
    let keep = length.saturating_sub(ellipsis.chars().count());
    s.chars().take(keep).collect::<String>() + &ellipsis
}

fn uniq(list: Vec<Value>) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::with_capacity(list.len());
    for v in list {
        if !out.contains(&v) {
            out.push(v);
        }
    }
    out
}

/// `nil`, `false`, and empty strings or lists take the default.
fn is_blank(v: &Value) -> bool {
    match v {
        Value::Str(s) => s.is_empty(),
        Value::List(l) => l.is_empty(),
        other => !other.is_truthy(),
    }
}

/// Numbers first, in numeric order; everything else by its string form.
fn sort_order(a: &Value, b: &Value) -> Ordering {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.to_string().cmp(&b.to_string()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Number {
    Int(i64),
    Float(f64),
}

/// Reads the math operand at parameter `index`, keeping integers integral.
fn number(filter: &str, index: usize, v: &Value) -> Result<Number> {
    let parsed = match v {
        Value::Nil => Some(Number::Int(0)),
        Value::Int(n) => Some(Number::Int(*n)),
        Value::Float(f) => Some(Number::Float(*f)),
        Value::Decimal(_) => v.as_f64().map(Number::Float),
        Value::Str(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .map(Number::Int)
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(Number::Float))
        }
        _ => None,
    };
    parsed.ok_or_else(|| Error::ArgumentType {
        filter: filter.to_string(),
        index,
        value: v.describe(),
    })
}

fn as_float(n: Number) -> f64 {
    match n {
        Number::Int(i) => i as f64,
        Number::Float(f) => f,
    }
}

fn arithmetic(
    filter: &str,
    a: &Value,
    b: &Value,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value> {
    let (x, y) = (number(filter, 0, a)?, number(filter, 1, b)?);
    if let (Number::Int(x), Number::Int(y)) = (x, y)
        && let Some(n) = int_op(x, y)
    {
        return Ok(Value::Int(n));
    }
    Ok(Value::Float(float_op(as_float(x), as_float(y))))
}

/// Integer operands divide with floor semantics.
fn divided_by(a: Value, b: Value) -> Result<Value> {
    match (number("divided_by", 0, &a)?, number("divided_by", 1, &b)?) {
        (_, Number::Int(0)) => Err(Error::custom("divided_by: division by zero")),
        (Number::Int(x), Number::Int(y)) => Ok(x
            .checked_div_euclid(y)
            .map_or(Value::Float(x as f64 / y as f64), Value::Int)),
        (x, y) => Ok(Value::Float(as_float(x) / as_float(y))),
    }
}

fn modulo(a: Value, b: Value) -> Result<Value> {
    match (number("modulo", 0, &a)?, number("modulo", 1, &b)?) {
        (_, Number::Int(0)) => Err(Error::custom("modulo: division by zero")),
        (Number::Int(x), Number::Int(y)) => Ok(x.checked_rem_euclid(y).map_or(Value::Int(0), Value::Int)),
        (x, y) => Ok(Value::Float(as_float(x) % as_float(y))),
    }
}

/// Formats with chrono's strftime syntax.
fn date(dt: NaiveDateTime, format: Thunk<String>) -> Result<String> {
    let format = format.call("%a, %b %d, %y".to_string());
    let mut out = String::new();
    write!(out, "{}", dt.format(&format))
        .map_err(|_| Error::custom(format!("date: invalid format '{}'", format)))?;
    Ok(out)
}
