// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Render state threaded through segment execution.
//!
//! A [`Context`] owns the parameter scope of one render, the template
//! [`Meta`]data and a handle to the output buffer. Sub-contexts (used by
//! `include`) copy the parameters and overlay the metadata, but append to the
//! same buffer, so output is global while bindings stay local.

use crate::loader::LoaderRef;
use crate::value::{Params, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

/// Escape function applied to expression output.
pub type EscapeFn = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Read-only template metadata: the "builtins" layer of expression scope.
#[derive(Clone, Default)]
pub struct Meta {
    name: String,
    escape: Option<EscapeFn>,
    loader: Option<LoaderRef>,
    globals: HashMap<String, Value>,
}

impl Meta {
    /// Creates metadata for the template `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// The template name used in diagnostics and exposed as `__name__`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renames the metadata's template.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// The escape function applied to expression output, if any.
    pub fn escape(&self) -> Option<&EscapeFn> {
        self.escape.as_ref()
    }

    /// Sets the escape function.
    pub fn with_escape(mut self, escape: Option<EscapeFn>) -> Self {
        self.escape = escape;
        self
    }

    /// The loader that compiled the template, used to include by name.
    pub fn loader(&self) -> Option<&LoaderRef> {
        self.loader.as_ref()
    }

    /// Attaches a loader.
    pub fn with_loader(mut self, loader: LoaderRef) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Registers a global value or function visible to expressions.
    pub fn set_global(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.globals.insert(name.into(), value.into());
    }

    /// Builder form of [`set_global`](Self::set_global).
    pub fn with_global(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_global(name, value);
        self
    }

    /// Looks up a metadata name.
    pub fn get(&self, name: &str) -> Option<Value> {
        match self.globals.get(name) {
            Some(value) => Some(value.clone()),
            None if name == "__name__" => Some(Value::Str(self.name.clone())),
            None => None,
        }
    }

    /// Returns this metadata overlaid with `other`.
    ///
    /// `other` always supplies the name and escape function; its loader wins
    /// when it has one, and its globals shadow ours.
    pub fn overlay(&self, other: &Meta) -> Meta {
        let mut globals = self.globals.clone();
        globals.extend(other.globals.iter().map(|(k, v)| (k.clone(), v.clone())));
        Meta {
            name: other.name.clone(),
            escape: other.escape.clone(),
            loader: other.loader.clone().or_else(|| self.loader.clone()),
            globals,
        }
    }
}

impl fmt::Debug for Meta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Meta")
            .field("name", &self.name)
            .field("escape", &self.escape.is_some())
            .field("loader", &self.loader.is_some())
            .field("globals", &self.globals.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// The live rendering state of one render call.
pub struct Context {
    params: Params,
    meta: Meta,
    buffer: Rc<RefCell<Vec<String>>>,
}

impl Context {
    /// Creates a context with an empty output buffer.
    pub fn new(params: Params, meta: Meta) -> Self {
        Self {
            params,
            meta,
            buffer: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// The parameter scope.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Binds a parameter, as loop variables do.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.params.insert(name.into(), value);
    }

    /// The template metadata.
    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    /// Resolves a name: parameters first, then metadata.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        self.params.get(name).cloned().or_else(|| self.meta.get(name))
    }

    /// Appends text to the shared output buffer.
    pub fn write(&self, text: impl Into<String>) {
        self.buffer.borrow_mut().push(text.into());
    }

    /// Creates a nested scope sharing this context's output buffer.
    ///
    /// The child sees a copy of our parameters updated with `params`, and our
    /// metadata overlaid with `meta`.
    pub fn sub_context(&self, params: Params, meta: &Meta) -> Context {
        let mut sub_params = self.params.clone();
        sub_params.extend(params);
        Context {
            params: sub_params,
            meta: self.meta.overlay(meta),
            buffer: Rc::clone(&self.buffer),
        }
    }

    /// Joins the output buffer into the rendered string.
    pub fn render(&self) -> String {
        self.buffer.borrow().concat()
    }

    /// Describes parameters and buffered output, for debugging failed renders.
    pub fn debug_dump(&self) -> String {
        let mut names: Vec<_> = self.params.iter().map(|(k, v)| format!("{}={}", k, v.repr())).collect();
        names.sort();
        format!("params: {{{}}}, buffer: {:?}", names.join(", "), self.buffer.borrow())
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("params", &self.params)
            .field("meta", &self.meta)
            .field("buffer", &self.buffer.borrow())
            .finish()
    }
}
