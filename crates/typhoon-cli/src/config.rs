// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Typhoon project configuration.
//!
//! Configuration is loaded from `typhoon.toml`. Relative template directories
//! are resolved against the directory holding the file.
//!
//! # Example Configuration
//!
//! ```toml
//! [templates]
//! dirs = ["templates", "shared"]
//!
//! [syntax]
//! comment = ["{#", "#}"]
//! expression = ["{{", "}}"]
//! block = ["{%", "%}"]
//!
//! [escape]
//! ".xml" = "html"
//! ".htm" = "none"
//!
//! [cache]
//! enabled = true
//! capacity = 0
//! ```

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use typhoon::{
    escape_html, Cache, DirectorySource, EscapeFn, Loader, MemoryCache, NoOpCache, Parser, Syntax,
    TemplateSource,
};

/// Default configuration file name.
pub const CONFIG_FILE: &str = "typhoon.toml";

/// Main configuration structure loaded from `typhoon.toml`.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Template lookup directories.
    #[serde(default)]
    pub templates: TemplatesConfig,
    /// Tag delimiters.
    #[serde(default)]
    pub syntax: SyntaxConfig,
    /// Escaping per file extension, on top of the HTML default.
    #[serde(default)]
    pub escape: BTreeMap<String, EscapeKind>,
    /// Compiled template cache.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Directory relative paths are resolved against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// Where templates are looked up.
#[derive(Debug, Deserialize)]
pub struct TemplatesConfig {
    /// Directories consulted in order (default: `["templates"]`).
    #[serde(default = "default_template_dirs")]
    pub dirs: Vec<String>,
}

/// Open and close delimiters for each tag kind.
#[derive(Debug, Deserialize)]
pub struct SyntaxConfig {
    /// Comment delimiters (default: `{# #}`).
    #[serde(default = "default_comment")]
    pub comment: (String, String),
    /// Expression delimiters (default: `{{ }}`).
    #[serde(default = "default_expression")]
    pub expression: (String, String),
    /// Block delimiters (default: `{% %}`).
    #[serde(default = "default_block")]
    pub block: (String, String),
}

/// How expression output of an extension is escaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EscapeKind {
    /// HTML entity escaping.
    Html,
    /// No escaping.
    None,
}

/// Cache settings.
#[derive(Debug, Deserialize)]
pub struct CacheConfig {
    /// Cache compiled templates (default: true).
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    /// Maximum number of cached templates, 0 for unbounded (default: 0).
    #[serde(default)]
    pub capacity: usize,
}

fn default_template_dirs() -> Vec<String> {
    vec!["templates".to_string()]
}

fn default_comment() -> (String, String) {
    ("{#".to_string(), "#}".to_string())
}

fn default_expression() -> (String, String) {
    ("{{".to_string(), "}}".to_string())
}

fn default_block() -> (String, String) {
    ("{%".to_string(), "%}".to_string())
}

fn default_cache_enabled() -> bool {
    true
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            dirs: default_template_dirs(),
        }
    }
}

impl Default for SyntaxConfig {
    fn default() -> Self {
        Self {
            comment: default_comment(),
            expression: default_expression(),
            block: default_block(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            capacity: 0,
        }
    }
}

impl Config {
    /// Loads configuration from `path`, or from `typhoon.toml` in the current
    /// directory when no path is given.
    ///
    /// A missing default file yields the default configuration; a missing
    /// explicit file is an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let config_path = path.unwrap_or_else(|| Path::new(CONFIG_FILE));

        if path.is_none() && !config_path.exists() {
            return Ok(Config {
                base_dir: std::env::current_dir()?,
                ..Config::default()
            });
        }

        let content = fs::read_to_string(config_path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", config_path.display(), e))?;
        let mut config = Self::parse(&content)?;
        config.base_dir = match config_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => std::env::current_dir()?,
        };
        Ok(config)
    }

    /// Parses configuration text. `base_dir` is left empty.
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Template directories resolved against [`base_dir`](Self::base_dir).
    pub fn template_dirs(&self) -> Vec<PathBuf> {
        self.templates.dirs.iter().map(|dir| self.base_dir.join(dir)).collect()
    }

    /// Builds a parser with the configured syntax and escaping.
    pub fn parser(&self) -> Parser {
        let syntax = Syntax::new(
            (self.syntax.comment.0.as_str(), self.syntax.comment.1.as_str()),
            (self.syntax.expression.0.as_str(), self.syntax.expression.1.as_str()),
            (self.syntax.block.0.as_str(), self.syntax.block.1.as_str()),
        );
        let mut parser = Parser::new().with_syntax(syntax);
        for (extension, kind) in &self.escape {
            parser = match kind {
                EscapeKind::Html => {
                    let escape: EscapeFn = Arc::new(escape_html);
                    parser.with_escape(extension, escape)
                }
                EscapeKind::None => parser.without_escape(extension),
            };
        }
        parser
    }

    /// One directory source per configured template directory.
    pub fn sources(&self) -> Vec<Box<dyn TemplateSource>> {
        self.template_dirs()
            .into_iter()
            .map(|dir| Box::new(DirectorySource::new(dir)) as Box<dyn TemplateSource>)
            .collect()
    }

    /// Builds a loader over the configured directories.
    pub fn loader(&self) -> Loader {
        let cache: Box<dyn Cache> = if self.cache.enabled {
            Box::new(MemoryCache::new(self.cache.capacity))
        } else {
            Box::new(NoOpCache::new())
        };
        Loader::builder()
            .sources(self.sources())
            .parser(self.parser())
            .boxed_cache(cache)
            .build()
    }
}
