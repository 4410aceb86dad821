use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::tpl::render_context::Context;
use crate::value::{Bindings, Value};
use std::collections::HashMap;

pub(super) fn register(engine: &Engine) {
    engine.register_tag("assign", assign);
    engine.register_block_with_clauses("if", &["elsif", "else"], if_block);
    engine.register_block_with_clauses("unless", &["else"], unless_block);
    engine.register_block_with_clauses("for", &["else"], for_block);
    engine.register_block_with_clauses("case", &["when", "else"], case_block);
    engine.register_block("capture", capture);
    engine.register_block("comment", |_ctx| Ok(String::new()));
}

fn syntax(ctx: &Context<'_, '_>, message: &str) -> Error {
    Error::ExpressionSyntax {
        fragment: ctx.tag_args().to_string(),
        message: format!("{} in '{}'", message, ctx.tag_name()),
        pos: ctx.pos(),
    }
}

fn is_variable_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '-')
}

/// `{% assign name = expr %}`
fn assign(ctx: &mut Context<'_, '_>) -> Result<String> {
    let Some((name, source)) = ctx.tag_args().split_once('=') else {
        return Err(syntax(ctx, "expected 'name = value'"));
    };
    let name = name.trim();
    if !is_variable_name(name) {
        return Err(syntax(ctx, "invalid variable name"));
    }
    let value = ctx.evaluate(source.trim())?;
    ctx.set(name, value);
    Ok(String::new())
}

/// `{% if a %} .. {% elsif b %} .. {% else %} .. {% endif %}`
fn if_block(ctx: &mut Context<'_, '_>) -> Result<String> {
    if ctx.evaluate(ctx.tag_args())?.is_truthy() {
        return ctx.inner_string();
    }
    for (i, clause) in ctx.clauses().iter().enumerate() {
        let taken = match clause.name() {
            "elsif" => ctx.evaluate(clause.args())?.is_truthy(),
            _ => true,
        };
        if taken {
            return ctx.render_clause(i);
        }
    }
    Ok(String::new())
}

fn unless_block(ctx: &mut Context<'_, '_>) -> Result<String> {
    if !ctx.evaluate(ctx.tag_args())?.is_truthy() {
        return ctx.inner_string();
    }
    match ctx.clauses().iter().position(|c| c.name() == "else") {
        Some(i) => ctx.render_clause(i),
        None => Ok(String::new()),
    }
}

/// Splits `x in expr [reversed]`.
fn parse_for_args<'a>(ctx: &Context<'_, '_>, args: &'a str) -> Result<(&'a str, &'a str, bool)> {
    let Some((var, rest)) = args.split_once(char::is_whitespace) else {
        return Err(syntax(ctx, "expected 'item in collection'"));
    };
    let Some(collection) = rest
        .trim_start()
        .strip_prefix("in")
        .filter(|s| s.starts_with(char::is_whitespace))
    else {
        return Err(syntax(ctx, "expected 'in'"));
    };
    if !is_variable_name(var) {
        return Err(syntax(ctx, "invalid loop variable"));
    }
    let collection = collection.trim();
    match collection.strip_suffix("reversed") {
        Some(head) if head.ends_with(char::is_whitespace) => Ok((var, head.trim_end(), true)),
        _ => Ok((var, collection, false)),
    }
}

/// Items a `for` loop visits. Maps yield `[key, value]` pairs in key order.
fn iteration_items(value: Value) -> Vec<Value> {
    match value {
        Value::Nil => Vec::new(),
        Value::List(items) => items,
        Value::Map(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            entries
                .into_iter()
                .map(|(k, v)| Value::List(vec![Value::Str(k), v]))
                .collect()
        }
        other => vec![other],
    }
}

fn forloop(index0: usize, length: usize) -> Value {
    let mut map = HashMap::new();
    map.insert("index".to_string(), Value::Int(index0 as i64 + 1));
    map.insert("index0".to_string(), Value::Int(index0 as i64));
    map.insert("rindex".to_string(), Value::Int((length - index0) as i64));
    map.insert("first".to_string(), Value::Bool(index0 == 0));
    map.insert("last".to_string(), Value::Bool(index0 + 1 == length));
    map.insert("length".to_string(), Value::Int(length as i64));
    Value::Map(map)
}

/// `{% for x in expr [reversed] %} .. {% else %} .. {% endfor %}`
fn for_block(ctx: &mut Context<'_, '_>) -> Result<String> {
    let (var, source, reversed) = parse_for_args(ctx, ctx.tag_args())?;
    let mut items = iteration_items(ctx.evaluate(source)?);
    if reversed {
        items.reverse();
    }

    if items.is_empty() {
        return match ctx.clauses().iter().position(|c| c.name() == "else") {
            Some(i) => ctx.render_clause(i),
            None => Ok(String::new()),
        };
    }

    let length = items.len();
    let mut out = String::new();
    for (i, item) in items.into_iter().enumerate() {
        let mut frame = Bindings::new();
        frame.insert(var.to_string(), item);
        frame.insert("forloop".to_string(), forloop(i, length));
        out.push_str(&ctx.render_body_with(frame)?);
    }
    Ok(out)
}

/// `{% case x %}{% when a, b %} .. {% else %} .. {% endcase %}`
fn case_block(ctx: &mut Context<'_, '_>) -> Result<String> {
    let subject = ctx.evaluate(ctx.tag_args())?;
    let mut fallback = None;
    for (i, clause) in ctx.clauses().iter().enumerate() {
        match clause.name() {
            "when" => {
                if ctx.evaluate_all(clause.args())?.contains(&subject) {
                    return ctx.render_clause(i);
                }
            }
            _ => fallback = fallback.or(Some(i)),
        }
    }
    match fallback {
        Some(i) => ctx.render_clause(i),
        None => Ok(String::new()),
    }
}

/// `{% capture name %} .. {% endcapture %}`
fn capture(ctx: &mut Context<'_, '_>) -> Result<String> {
    let name = ctx.tag_args().trim();
    if !is_variable_name(name) {
        return Err(syntax(ctx, "invalid variable name"));
    }
    let body = ctx.inner_string()?;
    ctx.set(name, Value::Str(body));
    Ok(String::new())
}
