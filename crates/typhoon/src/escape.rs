// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Output escaping selected by template file extension.

use crate::context::EscapeFn;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Escapes the characters that are significant in HTML text and attributes.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Maps file extensions (with the leading dot, e.g. `".html"`) to escapers.
#[derive(Clone)]
pub struct EscapeRegistry {
    by_extension: HashMap<String, EscapeFn>,
}

impl Default for EscapeRegistry {
    fn default() -> Self {
        let html: EscapeFn = Arc::new(escape_html);
        let mut by_extension = HashMap::new();
        by_extension.insert(".html".to_string(), Arc::clone(&html));
        by_extension.insert(".htm".to_string(), html);
        Self { by_extension }
    }
}

impl EscapeRegistry {
    /// A registry with no escapers at all.
    pub fn empty() -> Self {
        Self {
            by_extension: HashMap::new(),
        }
    }

    /// Registers `escape` for `extension`, replacing any previous escaper.
    pub fn insert(&mut self, extension: impl Into<String>, escape: EscapeFn) {
        self.by_extension.insert(normalize(extension.into()), escape);
    }

    /// Removes the escaper for `extension`.
    pub fn remove(&mut self, extension: &str) {
        self.by_extension.remove(&normalize(extension.to_string()));
    }

    /// Selects the escaper for a template name by its extension.
    pub fn for_name(&self, name: &str) -> Option<EscapeFn> {
        let extension = Path::new(name).extension()?.to_str()?;
        self.by_extension.get(&format!(".{}", extension)).cloned()
    }
}

fn normalize(extension: String) -> String {
    if extension.starts_with('.') {
        extension
    } else {
        format!(".{}", extension)
    }
}

impl std::fmt::Debug for EscapeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut extensions: Vec<_> = self.by_extension.keys().collect();
        extensions.sort();
        f.debug_struct("EscapeRegistry").field("extensions", &extensions).finish()
    }
}
