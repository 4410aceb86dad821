pub mod coerce;
pub mod serializer;

use crate::error::Result;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A host value that supports property-style lookup (a "drop").
///
/// Drops expose host data to templates without copying it into a [`Value::Map`].
pub trait Object: fmt::Debug + Send + Sync {
    /// Looks up a property. `None` renders as empty text.
    fn get(&self, key: &str) -> Option<Value>;

    /// Length reported by the `size` property and filter.
    fn size(&self) -> Option<usize> {
        None
    }

    /// Text emitted when the drop itself is rendered.
    fn render(&self) -> Option<String> {
        None
    }
}

/// 模板运行时的动态值
#[derive(Debug, Clone)]
pub enum Value {
    /// "No value": the result of a missed lookup.
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Arbitrary-precision decimal number
    Decimal(Decimal),
    Str(String),
    /// Date without time zone
    Date(NaiveDate),
    /// Date and time without time zone
    DateTime(NaiveDateTime),
    /// Ordered list of values (e.g. arrays, tuples)
    List(Vec<Value>),
    /// Key-value map (e.g. structs, JSON objects)
    Map(HashMap<String, Value>),
    Object(Arc<dyn Object>),
}

/// Top-level variable bindings supplied for one render.
pub type Bindings = HashMap<String, Value>;

impl Value {
    /// Only `Nil` and `false` are falsy; `0`, `""` and empty containers are truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            Value::Decimal(d) => d.to_f64(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Length of strings (in chars), lists, maps and sized drops.
    pub fn size(&self) -> Option<usize> {
        match self {
            Value::Str(s) => Some(s.chars().count()),
            Value::List(l) => Some(l.len()),
            Value::Map(m) => Some(m.len()),
            Value::Object(o) => o.size(),
            _ => None,
        }
    }

    /// Property or index access used by variable paths.
    ///
    /// Stored keys win over the `size`/`first`/`last` pseudo-properties.
    pub fn get(&self, key: &Value) -> Option<Value> {
        match (self, key) {
            (Value::Map(m), Value::Str(k)) => m.get(k).cloned().or_else(|| self.property(k)),
            (Value::Map(m), Value::Int(i)) => m.get(&i.to_string()).cloned(),
            (Value::Object(o), Value::Str(k)) => o.get(k).or_else(|| self.property(k)),
            (Value::List(l), Value::Int(i)) => {
                let idx = if *i < 0 { l.len() as i64 + i } else { *i };
                usize::try_from(idx).ok().and_then(|i| l.get(i)).cloned()
            }
            (_, Value::Str(k)) => self.property(k),
            _ => None,
        }
    }

    fn property(&self, key: &str) -> Option<Value> {
        match key {
            "size" => self.size().map(|n| Value::Int(n as i64)),
            "first" => match self {
                Value::List(l) => l.first().cloned(),
                _ => None,
            },
            "last" => match self {
                Value::List(l) => l.last().cloned(),
                _ => None,
            },
            _ => None,
        }
    }

    /// Describes the value for error messages.
    pub fn describe(&self) -> String {
        match self {
            Value::Nil => "nil".to_string(),
            Value::Str(s) => format!("{:?} (string)", s),
            Value::Bool(_) => format!("{} (bool)", self),
            Value::Int(_) => format!("{} (int)", self),
            Value::Float(_) => format!("{} (float)", self),
            Value::Decimal(_) => format!("{} (decimal)", self),
            Value::Date(_) | Value::DateTime(_) => format!("{} (date)", self),
            Value::List(l) => format!("list of {}", l.len()),
            Value::Map(m) => format!("map of {}", m.len()),
            Value::Object(_) => "object".to_string(),
        }
    }
}

impl fmt::Display for Value {
    /// Canonical string conversion used for output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::Decimal(d) => write!(f, "{}", d.normalize()),
            Value::Str(s) => f.write_str(s),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            Value::List(l) => l.iter().try_for_each(|v| write!(f, "{}", v)),
            Value::Map(m) => {
                let mut keys: Vec<&String> = m.keys().collect();
                keys.sort();
                f.write_str("{")?;
                for (i, k) in keys.into_iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", k, m[k])?;
                }
                f.write_str("}")
            }
            Value::Object(o) => match o.render() {
                Some(s) => f.write_str(&s),
                None => f.write_str("[object]"),
            },
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }
}

/// 任何能转换为 Value 的类型
pub trait ToValue {
    fn to_value(&self) -> Value;
}

/// Converts any serde-serializable host value.
pub fn to_value<T: Serialize + ?Sized>(value: &T) -> Result<Value> {
    value.serialize(serializer::ValueSerializer)
}

// --- 基础类型的宏实现 ---
macro_rules! impl_to_value_int {
    ($($rust_type:ty),*) => {
        $(
            impl ToValue for $rust_type {
                fn to_value(&self) -> Value {
                    Value::Int(*self as i64)
                }
            }
        )*
    };
}

impl_to_value_int!(i8, i16, i32, i64, isize, u8, u16, u32, usize);

impl ToValue for u64 {
    fn to_value(&self) -> Value {
        match i64::try_from(*self) {
            Ok(n) => Value::Int(n),
            Err(_) => Value::Float(*self as f64),
        }
    }
}

impl ToValue for f32 {
    fn to_value(&self) -> Value {
        Value::Float(*self as f64)
    }
}

impl ToValue for f64 {
    fn to_value(&self) -> Value {
        Value::Float(*self)
    }
}

impl ToValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

impl ToValue for char {
    fn to_value(&self) -> Value {
        Value::Str(self.to_string())
    }
}

impl ToValue for String {
    fn to_value(&self) -> Value {
        Value::Str(self.clone())
    }
}

impl ToValue for str {
    fn to_value(&self) -> Value {
        Value::Str(self.to_string())
    }
}

impl ToValue for Decimal {
    fn to_value(&self) -> Value {
        Value::Decimal(*self)
    }
}

impl ToValue for NaiveDate {
    fn to_value(&self) -> Value {
        Value::Date(*self)
    }
}

impl ToValue for NaiveDateTime {
    fn to_value(&self) -> Value {
        Value::DateTime(*self)
    }
}

impl ToValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl ToValue for () {
    fn to_value(&self) -> Value {
        Value::Nil
    }
}

// Blanket implementation for references
impl<T> ToValue for &T
where
    T: ToValue + ?Sized,
{
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Nil,
        }
    }
}

impl<T: ToValue> ToValue for Vec<T> {
    fn to_value(&self) -> Value {
        Value::List(self.iter().map(|v| v.to_value()).collect())
    }
}

impl<T: ToValue> ToValue for [T] {
    fn to_value(&self) -> Value {
        Value::List(self.iter().map(|v| v.to_value()).collect())
    }
}

impl<T: ToValue> ToValue for HashMap<String, T> {
    fn to_value(&self) -> Value {
        Value::Map(
            self.iter()
                .map(|(k, v)| (k.clone(), v.to_value()))
                .collect(),
        )
    }
}

impl<T: Object + 'static> ToValue for Arc<T> {
    fn to_value(&self) -> Value {
        Value::Object(self.clone())
    }
}
