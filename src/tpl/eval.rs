use crate::error::Result;
use crate::filters::{FilterRegistry, Kwargs};
use crate::tpl::ast::{Expr, Op, Segment};
use crate::tpl::render_context::Scope;
use crate::value::Value;
use crate::value::coerce::{ParamType, coerce};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Evaluates an expression against the scope chain.
///
/// A path that misses at any step yields `Nil`, never an error. Failures only
/// come from filters.
pub(crate) fn evaluate(expr: &Expr, scope: &Scope<'_>, filters: &FilterRegistry) -> Result<Value> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),
        Expr::Path(head, segments) => resolve_path(head, segments, scope, filters),
        Expr::Filter {
            input,
            name,
            args,
            named,
        } => {
            let piped = evaluate(input, scope, filters)?;
            let args = args
                .iter()
                .map(|a| evaluate(a, scope, filters))
                .collect::<Result<Vec<_>>>()?;
            let mut kwargs = HashMap::with_capacity(named.len());
            for (key, e) in named {
                kwargs.insert(key.clone(), evaluate(e, scope, filters)?);
            }
            filters.dispatch(name, piped, args, Kwargs::new(kwargs))
        }
        Expr::Binary(Op::And, l, r) => Ok(Value::Bool(
            evaluate(l, scope, filters)?.is_truthy() && evaluate(r, scope, filters)?.is_truthy(),
        )),
        Expr::Binary(Op::Or, l, r) => Ok(Value::Bool(
            evaluate(l, scope, filters)?.is_truthy() || evaluate(r, scope, filters)?.is_truthy(),
        )),
        Expr::Binary(op, l, r) => {
            let left = evaluate(l, scope, filters)?;
            let right = evaluate(r, scope, filters)?;
            Ok(Value::Bool(compare(*op, &left, &right)))
        }
        Expr::Range(low, high) => {
            let low = coerce(&evaluate(low, scope, filters)?, ParamType::Int);
            let high = coerce(&evaluate(high, scope, filters)?, ParamType::Int);
            match (low, high) {
                (Some(Value::Int(low)), Some(Value::Int(high))) => {
                    Ok(Value::List((low..=high).map(Value::Int).collect()))
                }
                _ => Ok(Value::List(Vec::new())),
            }
        }
    }
}

fn resolve_path(
    head: &str,
    segments: &[Segment],
    scope: &Scope<'_>,
    filters: &FilterRegistry,
) -> Result<Value> {
    let Some(mut current) = scope.lookup(head).cloned() else {
        return Ok(Value::Nil);
    };
    for segment in segments {
        let key = match segment {
            Segment::Key(k) => Value::Str(k.clone()),
            Segment::Index(e) => index_key(evaluate(e, scope, filters)?),
        };
        match current.get(&key) {
            Some(next) => current = next,
            None => return Ok(Value::Nil),
        }
    }
    Ok(current)
}

/// Integral floats index lists like integers.
fn index_key(key: Value) -> Value {
    match key {
        Value::Float(f) if f.fract() == 0.0 => Value::Int(f as i64),
        other => other,
    }
}

fn compare(op: Op, left: &Value, right: &Value) -> bool {
    match op {
        Op::Eq => left == right,
        Op::Ne => left != right,
        Op::Contains => contains(left, right),
        Op::Lt => order(left, right) == Some(Ordering::Less),
        Op::Le => matches!(order(left, right), Some(Ordering::Less | Ordering::Equal)),
        Op::Gt => order(left, right) == Some(Ordering::Greater),
        Op::Ge => matches!(order(left, right), Some(Ordering::Greater | Ordering::Equal)),
        Op::And | Op::Or => false,
    }
}

fn order(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
        (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
        (Value::Date(a), Value::DateTime(b)) => a.and_hms_opt(0, 0, 0).map(|a| a.cmp(b)),
        (Value::DateTime(a), Value::Date(b)) => b.and_hms_opt(0, 0, 0).map(|b| a.cmp(&b)),
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        },
    }
}

fn contains(haystack: &Value, needle: &Value) -> bool {
    match haystack {
        Value::Str(s) => s.contains(&needle.to_string()),
        Value::List(l) => l.contains(needle),
        Value::Map(m) => m.contains_key(&needle.to_string()),
        Value::Object(o) => o.get(&needle.to_string()).is_some(),
        _ => false,
    }
}
