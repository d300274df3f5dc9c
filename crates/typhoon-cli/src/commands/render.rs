// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Render command.

use crate::config::Config;
use std::fs;
use std::path::Path;
use typhoon::{Params, Value};

/// Parses a JSON object into template parameters.
pub fn parse_params(json: &str) -> anyhow::Result<Params> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    match Value::from(value) {
        Value::Map(map) => Ok(map.into_iter().collect()),
        other => anyhow::bail!("Parameters must be a JSON object, got {}", other.type_name()),
    }
}

/// Collects parameters from a JSON file and inline JSON; inline keys win.
pub fn collect_params(inline: Option<&str>, file: Option<&Path>) -> anyhow::Result<Params> {
    let mut params = Params::new();
    if let Some(path) = file {
        let content = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
        params.extend(parse_params(&content)?);
    }
    if let Some(json) = inline {
        params.extend(parse_params(json)?);
    }
    Ok(params)
}

/// Renders `name` with the configured loader.
pub fn render(config: &Config, name: &str, params: Params) -> anyhow::Result<String> {
    let loader = config.loader();
    tracing::debug!("Rendering '{}' from {:?}", name, loader.sources());
    Ok(loader.render(name, params)?)
}

/// Runs the render command, printing the output to stdout.
pub fn run(config: &Config, name: &str, inline: Option<&str>, file: Option<&Path>) -> anyhow::Result<()> {
    let params = collect_params(inline, file)?;
    print!("{}", render(config, name, params)?);
    Ok(())
}
