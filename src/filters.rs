//! Filter registry and dispatcher.
//!
//! Every filter carries a [`Signature`]: the declared type of each positional
//! parameter (the first one receives the piped value), which trailing
//! parameters are default-value thunks, and whether named arguments are
//! accepted. Dispatch checks the argument count against it and coerces each
//! resolved argument through the table in [`crate::value::coerce`] before the
//! callable runs.
//!
//! Typed closures derive their signature from their argument types:
//!
//! ```
//! use uliquid::{Engine, Thunk};
//!
//! let engine = Engine::new();
//! engine
//!     .register_filter("inc", |a: i64, by: Thunk<i64>| a + by.call(1))
//!     .unwrap();
//! let out = engine
//!     .parse_and_render("{{ 10 | inc }} {{ '20' | inc: 5 }}", &Default::default())
//!     .unwrap();
//! assert_eq!(out, "11 25");
//! ```

use crate::error::{Error, Result};
use crate::value::coerce::{ParamType, coerce};
use crate::value::{ToValue, Value};
use chrono::NaiveDateTime;
use dashmap::DashMap;
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;

/// How one declared parameter is filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamSpec {
    /// A positional argument that must be supplied.
    Required(ParamType),
    /// A trailing positional argument that may be omitted; see [`Thunk`].
    Thunk(ParamType),
    /// Receives the `key: value` arguments as [`Kwargs`].
    Named,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    params: Vec<ParamSpec>,
}

impl Signature {
    /// Builds a signature. The first positional parameter takes the piped
    /// value and must be required; thunks may only trail the positional list.
    pub fn new(params: Vec<ParamSpec>) -> std::result::Result<Self, String> {
        let positional: Vec<&ParamSpec> = params
            .iter()
            .filter(|p| !matches!(p, ParamSpec::Named))
            .collect();
        match positional.first() {
            Some(ParamSpec::Required(_)) => {}
            Some(_) => return Err("the piped parameter cannot be optional".to_string()),
            None => return Err("a filter needs a parameter for the piped value".to_string()),
        }
        if let Some(thunk_at) = positional
            .iter()
            .position(|p| matches!(p, ParamSpec::Thunk(_)))
            && positional[thunk_at..]
                .iter()
                .any(|p| matches!(p, ParamSpec::Required(_)))
        {
            return Err("optional parameters must come last".to_string());
        }
        if params.iter().filter(|p| matches!(p, ParamSpec::Named)).count() > 1 {
            return Err("at most one named-argument parameter is allowed".to_string());
        }
        Ok(Self { params })
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    fn positional(&self) -> impl Iterator<Item = &ParamSpec> {
        self.params.iter().filter(|p| !matches!(p, ParamSpec::Named))
    }

    fn accepts_named(&self) -> bool {
        self.params.contains(&ParamSpec::Named)
    }

    /// Checks arity and coerces resolved arguments into the declared types.
    ///
    /// Parameter indices in errors count the piped value as 0.
    pub fn adapt(
        &self,
        filter: &str,
        piped: Value,
        args: Vec<Value>,
        named: Kwargs,
    ) -> Result<FilterArgs> {
        let required = self
            .positional()
            .filter(|p| matches!(p, ParamSpec::Required(_)))
            .count();
        let total = self.positional().count();
        let supplied = args.len() + 1;
        if supplied < required || supplied > total {
            let expected = if required == total {
                format!("{}", required - 1)
            } else {
                format!("{} to {}", required - 1, total - 1)
            };
            return Err(Error::ArgumentCount {
                filter: filter.to_string(),
                expected,
                got: args.len(),
            });
        }
        if !named.is_empty() && !self.accepts_named() {
            return Err(Error::ArgumentCount {
                filter: filter.to_string(),
                expected: "no named".to_string(),
                got: named.len(),
            });
        }

        let mut inputs = std::iter::once(piped).chain(args);
        let mut values = Vec::with_capacity(total);
        for (index, spec) in self.positional().enumerate() {
            let (ty, optional) = match *spec {
                ParamSpec::Required(ty) => (ty, false),
                ParamSpec::Thunk(ty) => (ty, true),
                ParamSpec::Named => continue,
            };
            match inputs.next() {
                Some(value) => {
                    let converted = coerce(&value, ty).ok_or_else(|| Error::ArgumentType {
                        filter: filter.to_string(),
                        index,
                        value: value.describe(),
                    })?;
                    values.push(Some(converted));
                }
                None if optional => values.push(None),
                None => {
                    return Err(Error::ArgumentCount {
                        filter: filter.to_string(),
                        expected: format!("{}", required - 1),
                        got: supplied - 1,
                    });
                }
            }
        }

        Ok(FilterArgs {
            filter: filter.to_string(),
            index: 0,
            values: values.into_iter(),
            named,
        })
    }
}

/// Named `key: value` filter arguments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Kwargs(HashMap<String, Value>);

impl Kwargs {
    pub fn new(map: HashMap<String, Value>) -> Self {
        Self(map)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> HashMap<String, Value> {
        self.0
    }
}

/// A trailing optional filter parameter.
///
/// An ordinary default cannot tell `{{ n | inc }}` from `{{ n | inc: 0 }}`.
/// A thunk can: [`Thunk::call`] returns its argument when the template
/// omitted the value and the supplied value otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct Thunk<T> {
    supplied: Option<T>,
}

impl<T> Thunk<T> {
    pub fn omitted() -> Self {
        Self { supplied: None }
    }

    pub fn supplied(value: T) -> Self {
        Self {
            supplied: Some(value),
        }
    }

    pub fn is_supplied(&self) -> bool {
        self.supplied.is_some()
    }

    pub fn call(self, default: T) -> T {
        self.supplied.unwrap_or(default)
    }
}

/// Arguments after adaptation, consumed in declaration order.
#[derive(Debug)]
pub struct FilterArgs {
    filter: String,
    /// Parameter index of the next positional argument.
    index: usize,
    values: std::vec::IntoIter<Option<Value>>,
    named: Kwargs,
}

impl FilterArgs {
    /// Next positional argument; `Some(None)` is an omitted thunk.
    pub fn next_positional(&mut self) -> Option<Option<Value>> {
        let next = self.values.next();
        if next.is_some() {
            self.index += 1;
        }
        next
    }

    /// Converts the next positional argument into `T`. `None` means the
    /// argument was omitted.
    fn take_as<T: ArgValue>(&mut self) -> Result<Option<T>> {
        let index = self.index;
        match self.next_positional().flatten() {
            Some(value) => T::from_coerced(value)
                .map(Some)
                .map_err(|value| Error::ArgumentType {
                    filter: self.filter.clone(),
                    index,
                    value: value.describe(),
                }),
            None => Ok(None),
        }
    }

    pub fn named(&self) -> &Kwargs {
        &self.named
    }

    pub fn take_named(&mut self) -> Kwargs {
        std::mem::take(&mut self.named)
    }
}

/// A Rust type a coerced argument value converts into.
///
/// A value the type cannot hold is handed back and reported as an
/// argument type error.
pub trait ArgValue: Sized {
    const TYPE: ParamType;

    fn from_coerced(value: Value) -> std::result::Result<Self, Value>;
}

impl ArgValue for Value {
    const TYPE: ParamType = ParamType::Any;

    fn from_coerced(value: Value) -> std::result::Result<Self, Value> {
        Ok(value)
    }
}

impl ArgValue for String {
    const TYPE: ParamType = ParamType::Str;

    fn from_coerced(value: Value) -> std::result::Result<Self, Value> {
        match value {
            Value::Str(s) => Ok(s),
            other => Ok(other.to_string()),
        }
    }
}

impl ArgValue for i64 {
    const TYPE: ParamType = ParamType::Int;

    fn from_coerced(value: Value) -> std::result::Result<Self, Value> {
        match value {
            Value::Int(n) => Ok(n),
            other => Err(other),
        }
    }
}

macro_rules! impl_arg_value_narrow_int {
    ($($rust_type:ty),*) => {
        $(
            impl ArgValue for $rust_type {
                const TYPE: ParamType = ParamType::Int;

                fn from_coerced(value: Value) -> std::result::Result<Self, Value> {
                    let n = i64::from_coerced(value)?;
                    <$rust_type>::try_from(n).map_err(|_| Value::Int(n))
                }
            }
        )*
    };
}

impl_arg_value_narrow_int!(i32, usize);

impl ArgValue for f64 {
    const TYPE: ParamType = ParamType::Float;

    fn from_coerced(value: Value) -> std::result::Result<Self, Value> {
        match value {
            Value::Float(n) => Ok(n),
            other => Err(other),
        }
    }
}

impl ArgValue for bool {
    const TYPE: ParamType = ParamType::Bool;

    fn from_coerced(value: Value) -> std::result::Result<Self, Value> {
        Ok(value.is_truthy())
    }
}

impl ArgValue for Vec<Value> {
    const TYPE: ParamType = ParamType::List;

    fn from_coerced(value: Value) -> std::result::Result<Self, Value> {
        match value {
            Value::List(l) => Ok(l),
            other => Err(other),
        }
    }
}

impl ArgValue for HashMap<String, Value> {
    const TYPE: ParamType = ParamType::Map;

    fn from_coerced(value: Value) -> std::result::Result<Self, Value> {
        match value {
            Value::Map(m) => Ok(m),
            other => Err(other),
        }
    }
}

impl ArgValue for NaiveDateTime {
    const TYPE: ParamType = ParamType::Date;

    fn from_coerced(value: Value) -> std::result::Result<Self, Value> {
        match value {
            Value::DateTime(dt) => Ok(dt),
            other => Err(other),
        }
    }
}

/// One parameter slot of a typed filter closure.
pub trait FilterArg: Sized {
    fn spec() -> ParamSpec;

    fn take(args: &mut FilterArgs) -> Result<Self>;
}

macro_rules! impl_filter_arg {
    ($($rust_type:ty),*) => {
        $(
            impl FilterArg for $rust_type {
                fn spec() -> ParamSpec {
                    ParamSpec::Required(<$rust_type as ArgValue>::TYPE)
                }

                fn take(args: &mut FilterArgs) -> Result<Self> {
                    args.take_as::<$rust_type>()?
                        .ok_or_else(|| Error::custom("missing filter argument"))
                }
            }
        )*
    };
}

impl_filter_arg!(
    Value,
    String,
    i64,
    i32,
    usize,
    f64,
    bool,
    Vec<Value>,
    HashMap<String, Value>,
    NaiveDateTime
);

impl<T: ArgValue> FilterArg for Thunk<T> {
    fn spec() -> ParamSpec {
        ParamSpec::Thunk(T::TYPE)
    }

    fn take(args: &mut FilterArgs) -> Result<Self> {
        Ok(match args.take_as::<T>()? {
            Some(value) => Thunk::supplied(value),
            None => Thunk::omitted(),
        })
    }
}

impl FilterArg for Kwargs {
    fn spec() -> ParamSpec {
        ParamSpec::Named
    }

    fn take(args: &mut FilterArgs) -> Result<Self> {
        Ok(args.take_named())
    }
}

/// The full parameter list of a typed filter closure.
pub trait FilterArgTuple: Sized {
    fn specs() -> Vec<ParamSpec>;

    fn take_all(args: &mut FilterArgs) -> Result<Self>;
}

/// What a filter closure may return: a value, or a `Result` of one.
pub trait FilterResult {
    fn into_result(self) -> Result<Value>;
}

impl<R: ToValue> FilterResult for R {
    fn into_result(self) -> Result<Value> {
        Ok(self.to_value())
    }
}

impl<R: ToValue> FilterResult for Result<R> {
    fn into_result(self) -> Result<Value> {
        self.map(|v| v.to_value())
    }
}

/// Implemented for closures `Fn(A, B, ..) -> Rv` whose arguments are [`FilterArg`]s.
pub trait Filter<Rv, Args>: Send + Sync + 'static {
    fn apply(&self, args: Args) -> Rv;
}

macro_rules! tuple_impls {
    ( $( $name:ident )+ ) => {
        impl<Func, Rv, $($name),+> Filter<Rv, ($($name,)+)> for Func
        where
            Func: Fn($($name),+) -> Rv + Send + Sync + 'static,
        {
            #[allow(non_snake_case)]
            fn apply(&self, args: ($($name,)+)) -> Rv {
                let ($($name,)+) = args;
                (self)($($name,)+)
            }
        }

        impl<$($name: FilterArg),+> FilterArgTuple for ($($name,)+) {
            fn specs() -> Vec<ParamSpec> {
                vec![$($name::spec()),+]
            }

            fn take_all(args: &mut FilterArgs) -> Result<Self> {
                Ok(($($name::take(args)?,)+))
            }
        }
    };
}

tuple_impls! { A }
tuple_impls! { A B }
tuple_impls! { A B C }
tuple_impls! { A B C D }
tuple_impls! { A B C D E }
tuple_impls! { A B C D E F }

pub type FilterFn = dyn Fn(FilterArgs) -> Result<Value> + Send + Sync;

struct FilterEntry {
    signature: Signature,
    call: Box<FilterFn>,
}

/// Name → filter map. Safe to register into and dispatch from concurrently.
#[derive(Default)]
pub(crate) struct FilterRegistry {
    filters: DashMap<String, Arc<FilterEntry>>,
}

impl FilterRegistry {
    pub(crate) fn insert(&self, name: &str, signature: Signature, call: Box<FilterFn>) {
        let entry = Arc::new(FilterEntry { signature, call });
        if self.filters.insert(name.to_string(), entry).is_some() {
            debug!("Register: filter '{}' replaced", name);
        }
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }

    pub(crate) fn dispatch(
        &self,
        name: &str,
        piped: Value,
        args: Vec<Value>,
        named: Kwargs,
    ) -> Result<Value> {
        // Clone the entry out so no shard lock is held while the filter runs.
        let entry = self
            .filters
            .get(name)
            .map(|e| e.value().clone())
            .ok_or_else(|| Error::UnknownFilter(name.to_string()))?;
        let args = entry.signature.adapt(name, piped, args, named)?;
        (entry.call)(args)
    }
}

/// Boxes a typed closure together with the signature derived from its argument types.
pub(crate) fn typed<F, Rv, Args>(f: F) -> (std::result::Result<Signature, String>, Box<FilterFn>)
where
    F: Filter<Rv, Args>,
    Rv: FilterResult + 'static,
    Args: FilterArgTuple + 'static,
{
    let signature = Signature::new(Args::specs());
    let call: Box<FilterFn> = Box::new(move |mut args: FilterArgs| -> Result<Value> {
        let tuple = Args::take_all(&mut args)?;
        f.apply(tuple).into_result()
    });
    (signature, call)
}
