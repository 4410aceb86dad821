use crate::config::Config;
use crate::error::{Error, Result};
use crate::filters::{Filter, FilterArgTuple, FilterArgs, FilterRegistry, FilterResult, Signature, typed};
use crate::stdlib;
use crate::tags::TagRegistry;
use crate::tpl::ast::SeqNode;
use crate::tpl::parser::parse_template;
use crate::tpl::render::render_seq;
use crate::tpl::render_context::{Context, Scope};
use crate::value::{Bindings, Value, to_value};
use log::debug;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// A compiled template. Immutable, and safe to render from several threads at once.
#[derive(Debug, Clone)]
pub struct Template {
    root: SeqNode,
}

impl Template {
    /// The root of the node tree, for tooling that inspects templates.
    pub fn root(&self) -> &SeqNode {
        &self.root
    }
}

/// Owns the configuration and the filter/tag/block registries.
///
/// Registration takes `&self`, so an engine can be shared behind an `Arc`
/// and still accept new filters; renders already in progress see either the
/// old or the new entry.
pub struct Engine {
    config: Config,
    pub(crate) filters: FilterRegistry,
    pub(crate) tags: TagRegistry,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Default delimiters plus the standard tags and filters.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Default delimiters and empty registries.
    pub fn empty() -> Self {
        Self {
            config: Config::default(),
            filters: FilterRegistry::default(),
            tags: TagRegistry::default(),
        }
    }

    /// The given delimiters plus the standard tags and filters.
    ///
    /// # Panics
    ///
    /// Only if a standard filter declares an invalid signature. Those
    /// signatures come from fixed argument types, so this is a bug in
    /// `stdlib`, never a runtime condition.
    pub fn with_config(config: Config) -> Self {
        let engine = Self {
            config,
            ..Self::empty()
        };
        stdlib::register(&engine).expect("standard filter signatures are valid");
        engine
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Registers a typed filter. The first argument receives the piped value;
    /// a trailing [`crate::Thunk`] parameter may be omitted in templates.
    ///
    /// Fails with [`Error::Signature`] when the argument types do not form a
    /// valid signature, e.g. a thunk before a required parameter.
    pub fn register_filter<F, Rv, Args>(&self, name: &str, f: F) -> Result<()>
    where
        F: Filter<Rv, Args>,
        Rv: FilterResult + 'static,
        Args: FilterArgTuple + 'static,
    {
        let (signature, call) = typed(f);
        let signature = signature.map_err(|message| Error::Signature {
            filter: name.to_string(),
            message,
        })?;
        self.filters.insert(name, signature, call);
        Ok(())
    }

    /// Registers a filter with an explicit signature. The callable receives the
    /// arguments already counted and coerced.
    pub fn register_filter_raw<F>(&self, name: &str, signature: Signature, f: F)
    where
        F: Fn(FilterArgs) -> Result<Value> + Send + Sync + 'static,
    {
        self.filters.insert(name, signature, Box::new(f));
    }

    pub fn has_filter(&self, name: &str) -> bool {
        self.filters.contains(name)
    }

    /// Registers an inline tag: `{% name args %}`.
    pub fn register_tag<F>(&self, name: &str, f: F)
    where
        F: Fn(&mut Context<'_, '_>) -> Result<String> + Send + Sync + 'static,
    {
        self.tags.insert_tag(name, Arc::new(f));
    }

    /// Registers a block closed by `end<name>`.
    pub fn register_block<F>(&self, name: &str, f: F)
    where
        F: Fn(&mut Context<'_, '_>) -> Result<String> + Send + Sync + 'static,
    {
        self.tags.insert_block(name, &[], Arc::new(f));
    }

    /// Registers a block whose body may be split by intermediate markers such as `else`.
    pub fn register_block_with_clauses<F>(&self, name: &str, markers: &[&str], f: F)
    where
        F: Fn(&mut Context<'_, '_>) -> Result<String> + Send + Sync + 'static,
    {
        self.tags.insert_block(name, markers, Arc::new(f));
    }

    /// Compiles template source.
    pub fn parse(&self, source: &str) -> Result<Template> {
        let start = Instant::now();
        let result = parse_template(source, &self.config, &self.tags);
        let elapsed = start.elapsed().as_micros();

        match &result {
            Ok(root) => debug!(
                "Compile: bytes={}, nodes={}, elapsed={}us",
                source.len(),
                root.children().len(),
                elapsed
            ),
            Err(e) => debug!(
                "Compile: bytes={}, elapsed={}us, error={}",
                source.len(),
                elapsed,
                e
            ),
        }

        Ok(Template { root: result? })
    }

    /// Renders a template. Either the whole output or the first failure is returned.
    pub fn render(&self, template: &Template, bindings: &Bindings) -> Result<String> {
        let start = Instant::now();
        let mut scope = Scope::new(bindings);
        let mut out = String::new();
        let result = render_seq(self, &template.root, &mut scope, &mut out);
        let elapsed = start.elapsed().as_micros();

        match &result {
            Ok(()) => debug!("Render: bytes={}, elapsed={}us", out.len(), elapsed),
            Err(e) => debug!("Render: elapsed={}us, error={}", elapsed, e),
        }

        result.map(|()| out)
    }

    /// Renders with bindings taken from any serializable value that serializes to a map.
    pub fn render_serialize<T: Serialize + ?Sized>(
        &self,
        template: &Template,
        data: &T,
    ) -> Result<String> {
        match to_value(data)? {
            Value::Map(bindings) => self.render(template, &bindings),
            other => Err(Error::Serialization(format!(
                "bindings must serialize to a map, got {}",
                other.describe()
            ))),
        }
    }

    pub fn parse_and_render(&self, source: &str, bindings: &Bindings) -> Result<String> {
        let template = self.parse(source)?;
        self.render(&template, bindings)
    }
}
