// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Check command: compiles templates without rendering them.

use crate::config::Config;
use std::path::Path;
use typhoon::{Loader, TemplateError};

/// Outcome of compiling one template.
#[derive(Debug)]
pub struct CheckResult {
    /// Template name.
    pub name: String,
    /// Compile error, if any.
    pub error: Option<TemplateError>,
}

/// Lists every file below the configured template directories as a template
/// name relative to its directory.
pub fn discover(config: &Config) -> anyhow::Result<Vec<String>> {
    let mut names = Vec::new();
    for dir in config.template_dirs() {
        let pattern = format!("{}/**/*", dir.display());
        for path in glob::glob(&pattern)?.flatten().filter(|p| p.is_file()) {
            if let Ok(relative) = path.strip_prefix(&dir) {
                names.push(template_name(relative));
            }
        }
    }
    names.sort();
    names.dedup();
    Ok(names)
}

/// Joins path components with `/`, the separator template names use.
fn template_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Compiles each named template.
pub fn check(loader: &Loader, names: &[String]) -> Vec<CheckResult> {
    names
        .iter()
        .map(|name| CheckResult {
            name: name.clone(),
            error: loader.load(name).err(),
        })
        .collect()
}

/// Runs the check command. Fails when any template does not compile.
pub fn run(config: &Config, names: Vec<String>) -> anyhow::Result<()> {
    let names = if names.is_empty() { discover(config)? } else { names };
    let results = check(&config.loader(), &names);

    let mut failed = 0;
    for result in &results {
        match &result.error {
            None => println!("ok     {}", result.name),
            Some(error) => {
                failed += 1;
                println!("error  {}\n{}", result.name, error);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} templates failed to compile", failed, results.len());
    }
    println!("{} templates compiled", results.len());
    Ok(())
}
