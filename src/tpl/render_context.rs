use crate::engine::Engine;
use crate::error::{Pos, Result};
use crate::tpl::ast::{BlockNode, Clause, SeqNode};
use crate::tpl::eval::evaluate;
use crate::tpl::expr::{parse_expression, parse_expression_list};
use crate::tpl::render::render_seq;
use crate::value::{Bindings, Value};

/// The variable scope chain of one render.
///
/// The caller's bindings form the outermost layer and are never written to.
/// Above them sits an owned top frame that receives top-level assignments,
/// then one frame per active `render_body_with`.
pub struct Scope<'b> {
    bindings: &'b Bindings,
    frames: Vec<Bindings>,
}

impl<'b> Scope<'b> {
    pub fn new(bindings: &'b Bindings) -> Self {
        Self {
            bindings,
            frames: vec![Bindings::new()],
        }
    }

    /// Innermost binding of `name`.
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.frames
            .iter()
            .rev()
            .find_map(|f| f.get(name))
            .or_else(|| self.bindings.get(name))
    }

    pub fn push(&mut self, frame: Bindings) {
        self.frames.push(frame);
    }

    /// Pops the innermost frame. The top frame stays.
    pub fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Assigns in the innermost active frame.
    pub fn set(&mut self, name: &str, value: Value) {
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.to_string(), value);
        }
    }

    #[cfg(test)]
    fn depth(&self) -> usize {
        self.frames.len()
    }
}

/// What a tag or block callable sees while it renders.
///
/// Block-only operations (`inner_string`, `render_body_with`, `clauses`,
/// `render_clause`) yield empty results when called from an inline tag.
pub struct Context<'r, 'b> {
    engine: &'r Engine,
    scope: &'r mut Scope<'b>,
    out: &'r mut String,
    name: &'r str,
    args: &'r str,
    pos: Pos,
    block: Option<&'r BlockNode>,
}

impl<'r, 'b> Context<'r, 'b> {
    pub(crate) fn new(
        engine: &'r Engine,
        scope: &'r mut Scope<'b>,
        out: &'r mut String,
        name: &'r str,
        args: &'r str,
        pos: Pos,
        block: Option<&'r BlockNode>,
    ) -> Self {
        Self {
            engine,
            scope,
            out,
            name,
            args,
            pos,
            block,
        }
    }

    pub fn tag_name(&self) -> &'r str {
        self.name
    }

    /// The raw, unparsed argument string after the tag name.
    pub fn tag_args(&self) -> &'r str {
        self.args
    }

    pub fn pos(&self) -> Pos {
        self.pos
    }

    /// Writes straight to the render output, ahead of the text the callable returns.
    pub fn write(&mut self, text: &str) {
        self.out.push_str(text);
    }

    /// Parses and evaluates an expression in the current scope.
    pub fn evaluate(&self, source: &str) -> Result<Value> {
        let expr = parse_expression(source, self.pos)?;
        evaluate(&expr, self.scope, &self.engine.filters)
    }

    /// Evaluates a comma-separated list of expressions.
    pub fn evaluate_all(&self, source: &str) -> Result<Vec<Value>> {
        parse_expression_list(source, self.pos)?
            .iter()
            .map(|expr| evaluate(expr, self.scope, &self.engine.filters))
            .collect()
    }

    /// Value of a variable, `Nil` when unbound.
    pub fn get(&self, name: &str) -> Value {
        self.scope.lookup(name).cloned().unwrap_or(Value::Nil)
    }

    pub fn set(&mut self, name: &str, value: Value) {
        self.scope.set(name, value);
    }

    /// Renders the block body against the current scope.
    pub fn inner_string(&mut self) -> Result<String> {
        match self.block {
            Some(block) => self.render(block.body()),
            None => Ok(String::new()),
        }
    }

    /// Renders the block body with `frame` shadowing the current scope.
    pub fn render_body_with(&mut self, frame: Bindings) -> Result<String> {
        let Some(block) = self.block else {
            return Ok(String::new());
        };
        self.scope.push(frame);
        let result = self.render(block.body());
        self.scope.pop();
        result
    }

    /// The intermediate markers of the block in source order.
    pub fn clauses(&self) -> &'r [Clause] {
        match self.block {
            Some(block) => block.clauses(),
            None => &[],
        }
    }

    /// Renders the body that follows the `index`-th intermediate marker.
    pub fn render_clause(&mut self, index: usize) -> Result<String> {
        match self.clauses().get(index) {
            Some(clause) => self.render(clause.body()),
            None => Ok(String::new()),
        }
    }

    fn render(&mut self, seq: &SeqNode) -> Result<String> {
        let mut buf = String::new();
        render_seq(self.engine, seq, self.scope, &mut buf)?;
        Ok(buf)
    }
}
