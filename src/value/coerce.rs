//! The fixed coercion table applied to filter arguments.

use crate::value::Value;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use std::collections::HashMap;
use std::fmt;

/// Declared type of one filter parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Any,
    Str,
    Int,
    Float,
    Bool,
    List,
    Map,
    Date,
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParamType::Any => "any",
            ParamType::Str => "string",
            ParamType::Int => "int",
            ParamType::Float => "float",
            ParamType::Bool => "bool",
            ParamType::List => "list",
            ParamType::Map => "map",
            ParamType::Date => "date",
        };
        f.write_str(name)
    }
}

/// Converts `value` to the canonical variant for `ty`, or `None` when no
/// conversion exists.
pub fn coerce(value: &Value, ty: ParamType) -> Option<Value> {
    match ty {
        ParamType::Any => Some(value.clone()),
        ParamType::Str => Some(Value::Str(value.to_string())),
        ParamType::Bool => Some(Value::Bool(value.is_truthy())),
        ParamType::Int => to_int(value).map(Value::Int),
        ParamType::Float => to_float(value).map(Value::Float),
        ParamType::List => match value {
            Value::List(_) => Some(value.clone()),
            Value::Nil => Some(Value::List(Vec::new())),
            _ => None,
        },
        ParamType::Map => match value {
            Value::Map(_) => Some(value.clone()),
            Value::Nil => Some(Value::Map(HashMap::new())),
            _ => None,
        },
        ParamType::Date => to_datetime(value).map(Value::DateTime),
    }
}

fn to_int(value: &Value) -> Option<i64> {
    match value {
        Value::Nil => Some(0),
        Value::Int(n) => Some(*n),
        Value::Float(f) if f.is_finite() => Some(f.trunc() as i64),
        Value::Decimal(d) => d.trunc().to_i64(),
        Value::Str(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
        }
        _ => None,
    }
}

fn to_float(value: &Value) -> Option<f64> {
    match value {
        Value::Nil => Some(0.0),
        Value::Str(s) => s.trim().parse::<f64>().ok(),
        _ => value.as_f64(),
    }
}

const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

fn to_datetime(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::DateTime(dt) => Some(*dt),
        Value::Date(d) => d.and_hms_opt(0, 0, 0),
        Value::Int(secs) => DateTime::<Utc>::from_timestamp(*secs, 0).map(|dt| dt.naive_utc()),
        Value::Str(s) => parse_datetime(s.trim()),
        _ => None,
    }
}

fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    match s {
        "now" | "today" => return Some(Utc::now().naive_utc()),
        _ => {}
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_numeric_strings_become_numbers() {
        assert_eq!(coerce(&Value::Str("20".into()), ParamType::Int), Some(Value::Int(20)));
        assert_eq!(coerce(&Value::Str(" 2.9 ".into()), ParamType::Int), Some(Value::Int(2)));
        assert_eq!(
            coerce(&Value::Str("2.5".into()), ParamType::Float),
            Some(Value::Float(2.5))
        );
        assert_eq!(coerce(&Value::Str("abc".into()), ParamType::Int), None);
    }

    #[test]
    fn test_numbers_cross_convert() {
        assert_eq!(coerce(&Value::Float(-3.7), ParamType::Int), Some(Value::Int(-3)));
        assert_eq!(coerce(&Value::Int(4), ParamType::Float), Some(Value::Float(4.0)));
        assert_eq!(
            coerce(&Value::Decimal(Decimal::new(125, 1)), ParamType::Int),
            Some(Value::Int(12))
        );
        assert_eq!(coerce(&Value::Nil, ParamType::Int), Some(Value::Int(0)));
        assert_eq!(coerce(&Value::Bool(true), ParamType::Int), None);
    }

    #[test]
    fn test_string_and_bool_always_succeed() {
        assert_eq!(coerce(&Value::Int(7), ParamType::Str), Some(Value::Str("7".into())));
        assert_eq!(coerce(&Value::Nil, ParamType::Str), Some(Value::Str(String::new())));
        assert_eq!(coerce(&Value::Int(0), ParamType::Bool), Some(Value::Bool(true)));
        assert_eq!(coerce(&Value::Nil, ParamType::Bool), Some(Value::Bool(false)));
    }

    #[test]
    fn test_containers() {
        assert_eq!(coerce(&Value::Nil, ParamType::List), Some(Value::List(vec![])));
        assert_eq!(coerce(&Value::Str("x".into()), ParamType::List), None);
        assert_eq!(coerce(&Value::Int(1), ParamType::Map), None);
    }

    #[test]
    fn test_dates() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 9)
            .and_then(|d| d.and_hms_opt(12, 30, 0))
            .unwrap();
        assert_eq!(
            coerce(&Value::Str("2024-03-09 12:30:00".into()), ParamType::Date),
            Some(Value::DateTime(expected))
        );
        assert_eq!(
            coerce(&Value::Str("2024-03-09T12:30:00Z".into()), ParamType::Date),
            Some(Value::DateTime(expected))
        );
        assert_eq!(
            coerce(&Value::Int(0), ParamType::Date),
            NaiveDate::from_ymd_opt(1970, 1, 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(Value::DateTime)
        );
        assert_eq!(coerce(&Value::Str("soon".into()), ParamType::Date), None);
    }
}
