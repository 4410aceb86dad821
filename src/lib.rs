//! A Liquid-style template engine.
//!
//! ```
//! use uliquid::{Engine, bindings};
//!
//! let engine = Engine::new();
//! let out = engine
//!     .parse_and_render(
//!         "{{ hello | capitalize | append: ' Mundo' }}",
//!         &bindings! { "hello" => "hola" },
//!     )
//!     .unwrap();
//! assert_eq!(out, "Hola Mundo");
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod filters;
pub mod stdlib;
pub mod tags;
pub mod tpl;
pub mod value;

pub use config::{Config, Delims};
pub use engine::{Engine, Template};
pub use error::{Error, Pos, Result};
pub use filters::{FilterArgs, Kwargs, ParamSpec, Signature, Thunk};
pub use tpl::ast::{BlockNode, Clause, Expr, Node, NodeKind, ObjectNode, SeqNode, TagNode, TextNode};
pub use tpl::render_context::Context;
pub use value::coerce::ParamType;
pub use value::{Bindings, Object, ToValue, Value, to_value};

/// Builds [`Bindings`] from `key => value` pairs of any [`ToValue`] type.
///
/// ```
/// let b = uliquid::bindings! { "n" => 1, "name" => "x" };
/// assert_eq!(b.len(), 2);
/// ```
#[macro_export]
macro_rules! bindings {
    () => {
        $crate::Bindings::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::Bindings::new();
        $(
            map.insert(::std::string::String::from($key), $crate::ToValue::to_value(&$value));
        )+
        map
    }};
}
