// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Template sources.
//!
//! A [`TemplateSource`] maps a template name to its text. The [`Loader`]
//! consults its sources in order and compiles the first text it gets.
//!
//! # Implementations
//!
//! - [`MemorySource`]: a name to text map, mutable at runtime
//! - [`DirectorySource`]: files below a base directory (`filesystem` feature)
//!
//! Implement [`TemplateSource`] for other storage (a database, embedded
//! assets, ...).
//!
//! [`Loader`]: crate::Loader

use crate::error::Result;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

#[cfg(feature = "filesystem")]
use crate::error::TemplateError;
#[cfg(feature = "filesystem")]
use std::fs;
#[cfg(feature = "filesystem")]
use std::path::{Path, PathBuf};

/// Provides template text by name.
pub trait TemplateSource: Send + Sync {
    /// Returns the text of `name`, or `None` when this source does not have it.
    fn load(&self, name: &str) -> Result<Option<String>>;

    /// Describes the source in diagnostics.
    fn describe(&self) -> String;
}

/// In-memory template source.
///
/// Clones share the same map, so templates added through one handle are
/// visible through every loader holding another.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    templates: Arc<Mutex<HashMap<String, String>>>,
}

impl MemorySource {
    /// Creates an empty memory source.
    pub fn new() -> Self {
        Self::default()
    }

    fn with_templates_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut HashMap<String, String>) -> R,
    {
        f(&mut self.templates.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Adds or replaces a template.
    pub fn add_template(&self, name: impl Into<String>, content: impl Into<String>) {
        self.with_templates_mut(|templates| {
            templates.insert(name.into(), content.into());
        });
    }

    /// Builder form of [`add_template`](Self::add_template).
    pub fn with_template(self, name: impl Into<String>, content: impl Into<String>) -> Self {
        self.add_template(name, content);
        self
    }

    /// Removes a template.
    pub fn remove_template(&self, name: &str) {
        self.with_templates_mut(|templates| {
            templates.remove(name);
        });
    }

    /// Removes every template.
    pub fn clear(&self) {
        self.with_templates_mut(HashMap::clear);
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MemorySource {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let source = Self::new();
        for (name, content) in iter {
            source.add_template(name, content);
        }
        source
    }
}

impl TemplateSource for MemorySource {
    fn load(&self, name: &str) -> Result<Option<String>> {
        Ok(self.with_templates_mut(|templates| templates.get(name).cloned()))
    }

    fn describe(&self) -> String {
        "__memory__".to_string()
    }
}

/// Loads templates from files below a base directory.
///
/// Names are paths relative to the base directory. A name that resolves to a
/// file outside of it, through `..` or a symlink, is rejected.
#[cfg(feature = "filesystem")]
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

#[cfg(feature = "filesystem")]
impl DirectorySource {
    /// Creates a source serving files below `root`.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// The base directory.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(feature = "filesystem")]
impl TemplateSource for DirectorySource {
    fn load(&self, name: &str) -> Result<Option<String>> {
        let relative = Path::new(name.strip_prefix('/').unwrap_or(name));
        let path = self.root.join(relative);
        if !path.is_file() {
            return Ok(None);
        }

        let canonical_path = fs::canonicalize(&path).map_err(|e| {
            TemplateError::Resolution(format!("Failed to canonicalize path '{}': {}", path.display(), e))
        })?;
        let canonical_root = fs::canonicalize(&self.root).map_err(|e| {
            TemplateError::Resolution(format!("Failed to canonicalize root '{}': {}", self.root.display(), e))
        })?;
        if !canonical_path.starts_with(&canonical_root) {
            return Err(TemplateError::Resolution(format!(
                "Path '{}' escapes the template directory",
                name
            )));
        }

        tracing::debug!("Reading template '{}' from {}", name, canonical_path.display());
        Ok(Some(fs::read_to_string(&canonical_path)?))
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_source() {
        let source = MemorySource::new().with_template("a.html", "A");
        assert_eq!(source.load("a.html").unwrap().as_deref(), Some("A"));
        assert_eq!(source.load("b.html").unwrap(), None);

        let shared = source.clone();
        shared.add_template("b.html", "B");
        assert_eq!(source.load("b.html").unwrap().as_deref(), Some("B"));

        source.remove_template("a.html");
        assert_eq!(shared.load("a.html").unwrap(), None);
        source.clear();
        assert_eq!(source.load("b.html").unwrap(), None);
        assert_eq!(source.describe(), "__memory__");
    }

    #[test]
    fn test_memory_source_from_iter() {
        let source: MemorySource = [("x", "1"), ("y", "2")].into_iter().collect();
        assert_eq!(source.load("y").unwrap().as_deref(), Some("2"));
    }

    #[cfg(feature = "filesystem")]
    #[test]
    fn test_directory_source() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("partials")).unwrap();
        std::fs::write(dir.path().join("partials/nav.html"), "<nav/>").unwrap();

        let source = DirectorySource::new(dir.path());
        assert_eq!(source.load("partials/nav.html").unwrap().as_deref(), Some("<nav/>"));
        assert_eq!(source.load("/partials/nav.html").unwrap().as_deref(), Some("<nav/>"));
        assert_eq!(source.load("missing.html").unwrap(), None);
        assert_eq!(source.load("partials").unwrap(), None);
        assert_eq!(source.describe(), dir.path().display().to_string());
    }

    #[cfg(feature = "filesystem")]
    #[test]
    fn test_directory_source_rejects_escaping_names() {
        let outer = tempfile::TempDir::new().unwrap();
        let root = outer.path().join("templates");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(outer.path().join("secret.txt"), "s3cr3t").unwrap();

        let source = DirectorySource::new(&root);
        assert!(matches!(
            source.load("../secret.txt"),
            Err(TemplateError::Resolution(_))
        ));
    }
}
