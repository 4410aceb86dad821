pub mod ast;
pub(crate) mod eval;
pub mod expr;
pub(crate) mod parser;
pub(crate) mod render;
pub mod render_context;
pub mod token;
