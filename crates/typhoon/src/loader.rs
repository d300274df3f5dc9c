// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Named template loading with caching.
//!
//! A [`Loader`] resolves template names through an ordered list of
//! [`TemplateSource`]s, compiles the first text found and caches the result
//! by name. Templates it compiles carry a weak [`LoaderRef`] back to it, so
//! `{% include 'name' %}` can load siblings while the cache does not keep the
//! loader alive.
//!
//! # Example
//!
//! ```rust
//! use typhoon::{params, Loader, MemorySource};
//!
//! let source = MemorySource::new()
//!     .with_template("base.html", "<h1>{{ title }}</h1>{% include 'footer.html' %}")
//!     .with_template("footer.html", "<footer>{{ year }}</footer>");
//! let loader = Loader::builder().source(source).build();
//!
//! let html = loader.render("base.html", params! { "title" => "Home", "year" => 2026 })?;
//! assert_eq!(html, "<h1>Home</h1><footer>2026</footer>");
//! # Ok::<(), typhoon::TemplateError>(())
//! ```

use crate::cache::{Cache, MemoryCache};
use crate::context::Meta;
use crate::error::{Result, TemplateError};
use crate::parser::{Parser, STRING_TEMPLATE_NAME};
use crate::source::TemplateSource;
use crate::template::Template;
use crate::value::Params;
use std::fmt;
use std::sync::{Arc, Mutex, Weak};
use tracing::debug;

struct LoaderInner {
    sources: Vec<Box<dyn TemplateSource>>,
    parser: Parser,
    cache: Box<dyn Cache>,
    compile_lock: Mutex<()>,
}

/// Loads, compiles and caches templates by name.
///
/// `Loader` is a cheap handle: clones share sources, parser and cache.
#[derive(Clone)]
pub struct Loader {
    inner: Arc<LoaderInner>,
}

/// A non-owning reference to a [`Loader`], stored in template metadata.
#[derive(Clone)]
pub struct LoaderRef(Weak<LoaderInner>);

impl LoaderRef {
    /// Returns the loader if it is still alive.
    pub fn upgrade(&self) -> Option<Loader> {
        self.0.upgrade().map(|inner| Loader { inner })
    }
}

impl fmt::Debug for LoaderRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LoaderRef(alive: {})", self.0.strong_count() > 0)
    }
}

impl Loader {
    /// Creates a loader over `sources` with an unbounded memory cache.
    pub fn new(sources: Vec<Box<dyn TemplateSource>>, parser: Parser) -> Self {
        Self::builder().sources(sources).parser(parser).build()
    }

    /// Starts configuring a loader.
    pub fn builder() -> LoaderBuilder {
        LoaderBuilder::default()
    }

    /// Returns a weak reference to this loader.
    pub fn downgrade(&self) -> LoaderRef {
        LoaderRef(Arc::downgrade(&self.inner))
    }

    /// The parser templates are compiled with.
    pub fn parser(&self) -> &Parser {
        &self.inner.parser
    }

    /// Describes the configured sources in lookup order.
    pub fn sources(&self) -> Vec<String> {
        self.inner.sources.iter().map(|s| s.describe()).collect()
    }

    /// Compiles `source` with this loader attached, so it can include
    /// templates by name.
    pub fn compile(&self, source: &str, name: &str, params: Params, meta: Meta) -> Result<Template> {
        let meta = if meta.loader().is_some() {
            meta
        } else {
            meta.with_loader(self.downgrade())
        };
        self.inner.parser.compile(source, name, params, meta)
    }

    /// Compiles an unnamed template with this loader attached.
    pub fn compile_str(&self, source: &str) -> Result<Template> {
        self.compile(source, STRING_TEMPLATE_NAME, Params::new(), Meta::default())
    }

    /// Returns the template called `name`, compiling it on first use.
    ///
    /// Later calls return the same `Arc` until the cache is cleared.
    pub fn load(&self, name: &str) -> Result<Arc<Template>> {
        if let Some(template) = self.inner.cache.get(name)? {
            debug!("Cache hit for template '{}'", name);
            return Ok(template);
        }

        let _guard = self
            .inner
            .compile_lock
            .lock()
            .map_err(|_| TemplateError::Cache("Failed to acquire compile lock".to_string()))?;

        // Another thread may have compiled it while we waited.
        if let Some(template) = self.inner.cache.get(name)? {
            return Ok(template);
        }
        debug!("Cache miss for template '{}'", name);

        for source in &self.inner.sources {
            let Some(text) = source.load(name)? else {
                continue;
            };
            debug!("Compiling template '{}' from {}", name, source.describe());
            let template = Arc::new(self.compile(&text, name, Params::new(), Meta::default())?);
            self.inner.cache.set(name, Arc::clone(&template))?;
            return Ok(template);
        }

        Err(TemplateError::NotFound(name.to_string()))
    }

    /// Loads `name` and renders it with `params`.
    pub fn render(&self, name: &str, params: Params) -> Result<String> {
        self.load(name)?.render(params)
    }

    /// Drops every cached template; the next load of each name recompiles.
    pub fn clear_cache(&self) -> Result<()> {
        debug!("Clearing template cache");
        self.inner.cache.clear()
    }

    /// Whether `name` is currently cached.
    pub fn is_cached(&self, name: &str) -> bool {
        self.inner.cache.contains_key(name)
    }
}

impl fmt::Debug for Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Loader")
            .field("sources", &self.sources())
            .field("parser", &self.inner.parser)
            .field("cache", &self.inner.cache)
            .finish()
    }
}

/// Builder for [`Loader`].
#[derive(Default)]
pub struct LoaderBuilder {
    sources: Vec<Box<dyn TemplateSource>>,
    parser: Option<Parser>,
    cache: Option<Box<dyn Cache>>,
}

impl LoaderBuilder {
    /// Appends a source; sources are consulted in the order added.
    pub fn source(mut self, source: impl TemplateSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Appends already boxed sources.
    pub fn sources(mut self, sources: Vec<Box<dyn TemplateSource>>) -> Self {
        self.sources.extend(sources);
        self
    }

    /// Sets the parser, [`Parser::new`] by default.
    pub fn parser(mut self, parser: Parser) -> Self {
        self.parser = Some(parser);
        self
    }

    /// Sets the cache, an unbounded [`MemoryCache`] by default.
    pub fn cache(mut self, cache: impl Cache + 'static) -> Self {
        self.cache = Some(Box::new(cache));
        self
    }

    /// Sets an already boxed cache.
    pub fn boxed_cache(mut self, cache: Box<dyn Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Builds the loader.
    pub fn build(self) -> Loader {
        Loader {
            inner: Arc::new(LoaderInner {
                sources: self.sources,
                parser: self.parser.unwrap_or_default(),
                cache: self.cache.unwrap_or_else(|| Box::new(MemoryCache::unbounded())),
                compile_lock: Mutex::new(()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::NoOpCache;
    use crate::params;
    use crate::source::MemorySource;

    #[test]
    fn test_load_caches_by_name() {
        let source = MemorySource::new().with_template("a.txt", "A");
        let loader = Loader::builder().source(source.clone()).build();

        let first = loader.load("a.txt").unwrap();
        source.add_template("a.txt", "changed");
        let second = loader.load("a.txt").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.render(params! {}).unwrap(), "A");

        loader.clear_cache().unwrap();
        assert!(!loader.is_cached("a.txt"));
        let third = loader.load("a.txt").unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(third.render(params! {}).unwrap(), "changed");
    }

    #[test]
    fn test_sources_are_consulted_in_order() {
        let loader = Loader::builder()
            .source(MemorySource::new().with_template("shared", "first"))
            .source(
                MemorySource::new()
                    .with_template("shared", "second")
                    .with_template("only-second", "2"),
            )
            .build();
        assert_eq!(loader.render("shared", params! {}).unwrap(), "first");
        assert_eq!(loader.render("only-second", params! {}).unwrap(), "2");
        assert_eq!(loader.sources(), vec!["__memory__", "__memory__"]);
    }

    #[test]
    fn test_not_found() {
        let loader = Loader::builder().source(MemorySource::new()).build();
        match loader.load("nope.html") {
            Err(TemplateError::NotFound(name)) => assert_eq!(name, "nope.html"),
            other => panic!("expected not found, got {other:?}"),
        }
    }

    #[test]
    fn test_compile_errors_are_not_cached() {
        let source = MemorySource::new().with_template("bad", "{% if x %}");
        let loader = Loader::builder().source(source.clone()).build();
        assert!(loader.load("bad").is_err());
        assert!(!loader.is_cached("bad"));

        source.add_template("bad", "{% if x %}fixed{% endif %}");
        assert_eq!(loader.render("bad", params! { "x" => true }).unwrap(), "fixed");
    }

    #[test]
    fn test_noop_cache_recompiles() {
        let loader = Loader::builder()
            .source(MemorySource::new().with_template("t", "x"))
            .cache(NoOpCache::new())
            .build();
        let a = loader.load("t").unwrap();
        let b = loader.load("t").unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_compiled_templates_reference_the_loader() {
        let loader = Loader::builder()
            .source(MemorySource::new().with_template("inner", "[{{ v }}]"))
            .build();
        let template = loader.compile_str("{% include 'inner' %}").unwrap();
        assert!(template.meta().loader().and_then(LoaderRef::upgrade).is_some());
        assert_eq!(template.render(params! { "v" => 1 }).unwrap(), "[1]");

        drop(loader);
        let err = template.render(params! { "v" => 1 }).unwrap_err();
        assert_eq!(err.to_string(), "Cannot load 'inner' by name [__string__ on line 1]");
    }

    #[test]
    fn test_loader_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Loader>();
        assert_send_sync::<Arc<Template>>();
    }
}
