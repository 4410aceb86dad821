use crate::error::Result;
use crate::tpl::render_context::Context;
use dashmap::DashMap;
use log::debug;
use std::sync::Arc;

/// Render callable shared by inline tags and blocks.
pub type TagFn = dyn Fn(&mut Context<'_, '_>) -> Result<String> + Send + Sync;

#[derive(Clone)]
pub(crate) enum TagEntry {
    Inline(Arc<TagFn>),
    Block {
        render: Arc<TagFn>,
        /// `end<name>`
        end: String,
        /// Intermediate markers such as `else`.
        markers: Vec<String>,
    },
}

/// Tags and blocks share one namespace; registering either under an existing
/// name replaces the previous entry.
#[derive(Default)]
pub(crate) struct TagRegistry {
    entries: DashMap<String, TagEntry>,
}

impl TagRegistry {
    pub(crate) fn insert_tag(&self, name: &str, render: Arc<TagFn>) {
        self.insert(name, TagEntry::Inline(render));
    }

    pub(crate) fn insert_block(&self, name: &str, markers: &[&str], render: Arc<TagFn>) {
        self.insert(
            name,
            TagEntry::Block {
                render,
                end: format!("end{}", name),
                markers: markers.iter().map(|m| m.to_string()).collect(),
            },
        );
    }

    fn insert(&self, name: &str, entry: TagEntry) {
        if self.entries.insert(name.to_string(), entry).is_some() {
            debug!("Register: tag '{}' replaced", name);
        }
    }

    pub(crate) fn get(&self, name: &str) -> Option<TagEntry> {
        self.entries.get(name).map(|e| e.value().clone())
    }

    /// Whether `name` ends or continues some registered block.
    pub(crate) fn is_closer_or_marker(&self, name: &str) -> bool {
        self.entries.iter().any(|e| match e.value() {
            TagEntry::Block { end, markers, .. } => {
                end == name || markers.iter().any(|m| m == name)
            }
            TagEntry::Inline(_) => false,
        })
    }
}
