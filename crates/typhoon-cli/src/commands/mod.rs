// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! CLI command implementations.
//!
//! - `render`: Render a template to stdout
//! - `check`: Compile templates and report errors
//! - `tokens`: Dump the token stream of a template

/// Template compilation check command.
pub mod check;
/// Template render command.
pub mod render;
/// Token dump command.
pub mod tokens;

use typhoon::TemplateSource;

/// Reads the raw text of `name` from the first source that has it.
pub(crate) fn read_template(sources: &[Box<dyn TemplateSource>], name: &str) -> anyhow::Result<String> {
    for source in sources {
        if let Some(text) = source.load(name)? {
            return Ok(text);
        }
    }
    anyhow::bail!("could not find template '{}'", name)
}
