use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::tags::TagEntry;
use crate::tpl::ast::{BlockNode, Node, SeqNode, TagNode};
use crate::tpl::eval::evaluate;
use crate::tpl::render_context::{Context, Scope};
use log::trace;
use std::fmt::Write;

/// Renders a sequence into `out`, stopping at the first failure.
pub(crate) fn render_seq(
    engine: &Engine,
    seq: &SeqNode,
    scope: &mut Scope<'_>,
    out: &mut String,
) -> Result<()> {
    for node in seq.children() {
        match node {
            Node::Seq(inner) => render_seq(engine, inner, scope, out)?,
            Node::Text(text) => out.push_str(text.text()),
            Node::Object(object) => {
                let value = evaluate(object.expr(), scope, &engine.filters)
                    .map_err(|e| e.wrap(object.args(), object.pos()))?;
                write!(out, "{}", value).map_err(Error::custom)?;
            }
            Node::Tag(tag) => render_tag(engine, tag, scope, out)?,
            Node::Block(block) => render_block(engine, block, scope, out)?,
        }
    }
    Ok(())
}

fn render_tag(engine: &Engine, tag: &TagNode, scope: &mut Scope<'_>, out: &mut String) -> Result<()> {
    let render = match engine.tags.get(tag.name()) {
        Some(TagEntry::Inline(render)) => render,
        _ => {
            return Err(Error::UnknownTag {
                name: tag.name().to_string(),
                pos: tag.pos(),
            });
        }
    };
    trace!("Render: tag={} pos={}", tag.name(), tag.pos().offset);
    let mut ctx = Context::new(engine, scope, out, tag.name(), tag.args(), tag.pos(), None);
    let text = render(&mut ctx).map_err(|e| e.wrap(tag.name(), tag.pos()))?;
    out.push_str(&text);
    Ok(())
}

fn render_block(
    engine: &Engine,
    block: &BlockNode,
    scope: &mut Scope<'_>,
    out: &mut String,
) -> Result<()> {
    let render = match engine.tags.get(block.name()) {
        Some(TagEntry::Block { render, .. }) => render,
        _ => {
            return Err(Error::UnknownTag {
                name: block.name().to_string(),
                pos: block.pos(),
            });
        }
    };
    trace!(
        "Render: block={} clauses={} pos={}",
        block.name(),
        block.clauses().len(),
        block.pos().offset
    );
    let mut ctx = Context::new(
        engine,
        scope,
        out,
        block.name(),
        block.args(),
        block.pos(),
        Some(block),
    );
    let text = render(&mut ctx).map_err(|e| e.wrap(block.name(), block.pos()))?;
    out.push_str(&text);
    Ok(())
}
